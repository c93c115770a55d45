//! Client for the live transcription connection.
//!
//! One task owns both halves of the WebSocket. Audio frames are accepted the
//! moment the caller produces them, but nothing goes on the wire until the
//! service acknowledges setup: earlier frames are buffered and flushed in
//! their original order once the acknowledgment lands. A service that never
//! acknowledges setup within the deadline fails the connection. Dropping the
//! last [`LiveHandle`] closes the outbound queue; the task then sends a close
//! frame and lets the connection wind down naturally.

use anyhow::Result;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use super::protocol::{self, ServerMessage};
use crate::audio::AudioPayload;
use crate::error::ScribeError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// How long to wait for the service to acknowledge setup before failing.
const SETUP_TIMEOUT: Duration = Duration::from_secs(30);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Connection lifecycle events surfaced to the session controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    /// Setup acknowledged; the service is listening (start the clock)
    Opened,
    /// Incremental transcript fragment (append to the accumulator)
    Transcript(String),
    /// The connection closed
    Closed,
    /// Fatal connection failure; the caller must tear down and error out
    Error(String),
}

#[derive(Debug, Clone)]
pub struct LiveClientConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
}

/// Cheap cloneable handle for pushing audio frames at the encoder's cadence.
#[derive(Clone)]
pub struct LiveHandle {
    audio_tx: mpsc::UnboundedSender<AudioPayload>,
}

impl LiveHandle {
    /// Queue an encoded frame for transmission. Frames are sent in the order
    /// queued; a frame queued after the connection died is silently dropped.
    pub fn send_audio(&self, payload: AudioPayload) {
        if self.audio_tx.send(payload).is_err() {
            debug!("live connection gone; dropping audio frame");
        }
    }
}

/// Open the live transcription connection and start its driver task.
///
/// Returns once the socket is connected and the setup message is on the wire;
/// the `Opened` event signals when the service actually acknowledged setup.
pub async fn connect(config: &LiveClientConfig) -> Result<(LiveHandle, mpsc::Receiver<LiveEvent>)> {
    let url = format!("{}?key={}", config.endpoint, config.api_key);

    let (ws, _response) = timeout(CONNECT_TIMEOUT, connect_async(url))
        .await
        .map_err(|_| {
            ScribeError::Connection("timed out connecting to the live service".to_string())
        })?
        .map_err(|e| ScribeError::Connection(format!("could not reach the live service: {}", e)))?;

    let (mut write, read) = ws.split();

    let setup = serde_json::to_string(&protocol::setup_message(&config.model))?;
    write
        .send(Message::Text(setup.into()))
        .await
        .map_err(|e| ScribeError::Connection(format!("failed to send session setup: {}", e)))?;

    let (audio_tx, audio_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::channel(256);

    tokio::spawn(run_connection(write, read, audio_rx, event_tx));

    Ok((LiveHandle { audio_tx }, event_rx))
}

/// Serialize one frame and put it on the wire. The error string is ready to
/// surface as a [`LiveEvent::Error`].
async fn send_frame(write: &mut WsSink, payload: AudioPayload) -> Result<(), String> {
    let msg = match serde_json::to_string(&protocol::realtime_input(payload)) {
        Ok(json) => json,
        Err(e) => {
            warn!("failed to serialize audio frame: {}", e);
            return Ok(());
        }
    };

    write
        .send(Message::Text(msg.into()))
        .await
        .map_err(|e| format!("failed to send audio: {}", e))
}

async fn run_connection(
    mut write: WsSink,
    mut read: WsSource,
    mut audio_rx: mpsc::UnboundedReceiver<AudioPayload>,
    events: mpsc::Sender<LiveEvent>,
) {
    // Audio is held back until the service acknowledges setup.
    let mut ready = false;
    let mut sending = true;
    let mut pending: Vec<AudioPayload> = Vec::new();

    let setup_deadline = tokio::time::sleep(SETUP_TIMEOUT);
    tokio::pin!(setup_deadline);

    'conn: loop {
        tokio::select! {
            () = &mut setup_deadline, if !ready => {
                let _ = events
                    .send(LiveEvent::Error(
                        "live service did not acknowledge setup in time".to_string(),
                    ))
                    .await;
                break;
            },

            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ServerMessage>(text.as_str()) {
                        Ok(server) => {
                            if server.setup_complete.is_some() && !ready {
                                ready = true;
                                let _ = events.send(LiveEvent::Opened).await;

                                // Flush frames buffered while the handshake
                                // was in flight, oldest first.
                                for payload in pending.drain(..) {
                                    if let Err(e) = send_frame(&mut write, payload).await {
                                        let _ = events.send(LiveEvent::Error(e)).await;
                                        break 'conn;
                                    }
                                }
                            }

                            if let Some(content) = server.server_content {
                                if let Some(text) =
                                    content.input_transcription.and_then(|t| t.text)
                                {
                                    if !text.is_empty() {
                                        let _ = events.send(LiveEvent::Transcript(text)).await;
                                    }
                                }

                                if content.turn_complete.unwrap_or(false) {
                                    debug!("live turn complete");
                                }
                            }
                        }
                        Err(e) => debug!("ignoring unrecognized live message: {}", e),
                    }
                }
                // Audio-modality output; required by the protocol, unused here
                Some(Ok(Message::Binary(_))) => {}
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => {
                    let _ = events.send(LiveEvent::Closed).await;
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let _ = events
                        .send(LiveEvent::Error(format!("live connection failed: {}", e)))
                        .await;
                    break;
                }
            },

            payload = audio_rx.recv(), if sending => match payload {
                Some(payload) if ready => {
                    if let Err(e) = send_frame(&mut write, payload).await {
                        let _ = events.send(LiveEvent::Error(e)).await;
                        break;
                    }
                }
                Some(payload) => pending.push(payload),
                None => {
                    // Caller hung up; close our side and drain the server's
                    // remaining messages until it closes too.
                    sending = false;
                    let _ = write.send(Message::Close(None)).await;
                }
            },
        }
    }

    debug!("live connection task exited");
}
