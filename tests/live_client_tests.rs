//! Integration tests for the live connection driver, against an in-process
//! WebSocket server.

use futures::{SinkExt, StreamExt};
use scribe_meetings::encode_pcm16;
use scribe_meetings::live::{connect, LiveClientConfig, LiveEvent};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{timeout, Duration};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

fn client_config(addr: std::net::SocketAddr) -> LiveClientConfig {
    LiveClientConfig {
        endpoint: format!("ws://{}/live", addr),
        model: "models/test".to_string(),
        api_key: "test-key".to_string(),
    }
}

#[tokio::test]
async fn frames_sent_before_setup_ack_arrive_in_order() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // The server holds the setup acknowledgment until told, so every frame
    // the client produces meanwhile must be buffered on its side.
    let (ack_tx, ack_rx) = oneshot::channel::<()>();
    let (frames_tx, mut frames_rx) = mpsc::unbounded_channel::<String>();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        // The handshake always comes first
        let setup = ws.next().await.unwrap().unwrap();
        assert!(setup.to_text().unwrap().contains("\"setup\""));

        ack_rx.await.unwrap();
        ws.send(Message::Text(r#"{"setupComplete":{}}"#.into()))
            .await
            .unwrap();

        while let Some(Ok(msg)) = ws.next().await {
            match msg {
                Message::Text(text) => {
                    let value: serde_json::Value =
                        serde_json::from_str(text.as_str()).unwrap();
                    let data = value["realtimeInput"]["mediaChunks"][0]["data"]
                        .as_str()
                        .unwrap()
                        .to_string();
                    frames_tx.send(data).unwrap();
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    let (handle, mut events) = connect(&client_config(addr)).await.unwrap();

    let early: Vec<_> = [[0.1f32], [0.2], [0.3]]
        .iter()
        .map(|s| encode_pcm16(s))
        .collect();
    for payload in &early {
        handle.send_audio(payload.clone());
    }

    // Release the acknowledgment only after the early frames are queued
    ack_tx.send(()).unwrap();

    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event, LiveEvent::Opened);

    let late = encode_pcm16(&[0.4]);
    handle.send_audio(late.clone());

    let mut received = Vec::new();
    for _ in 0..4 {
        received.push(timeout(WAIT, frames_rx.recv()).await.unwrap().unwrap());
    }

    let expected: Vec<String> = early
        .iter()
        .map(|p| p.data.clone())
        .chain(std::iter::once(late.data))
        .collect();
    assert_eq!(received, expected);

    drop(handle);
    timeout(WAIT, server).await.unwrap().unwrap();
}

#[tokio::test]
async fn dropping_the_handle_closes_the_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        let setup = ws.next().await.unwrap().unwrap();
        assert!(setup.to_text().unwrap().contains("\"setup\""));

        ws.send(Message::Text(r#"{"setupComplete":{}}"#.into()))
            .await
            .unwrap();

        // Drain to completion so the close handshake finishes
        let mut saw_close = false;
        while let Some(msg) = ws.next().await {
            match msg {
                Ok(Message::Close(_)) => saw_close = true,
                Ok(_) => {}
                Err(_) => break,
            }
        }
        saw_close
    });

    let (handle, mut events) = connect(&client_config(addr)).await.unwrap();

    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event, LiveEvent::Opened);

    drop(handle);

    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event, LiveEvent::Closed);

    let saw_close = timeout(WAIT, server).await.unwrap().unwrap();
    assert!(saw_close, "server never received a close frame");
}
