//! Orchestrates a single recording session: capture, live streaming, the
//! duration timer, and finalization into the store.
//!
//! All user-facing operations funnel through the `transition` table before
//! touching any resources, so a request that arrives from a stale state is
//! rejected up front instead of tearing down a live session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::audio::{
    convert, encode_pcm16, AudioCapture, CaptureConfig, CaptureFactory, CaptureSource,
};
use crate::config::Config;
use crate::live::{self, LiveClientConfig, LiveEvent, LiveHandle};
use crate::session::record::Session;
use crate::session::state::{transition, LifecycleEvent, LifecycleState};
use crate::store::SessionStore;
use crate::summary::Summarizer;

/// Resources that exist only while a session is in flight.
#[derive(Default)]
struct ActiveParts {
    capture: Option<Box<dyn AudioCapture>>,
    live: Option<LiveHandle>,
    timer: Option<tokio::task::JoinHandle<()>>,
}

/// Point-in-time view of the controller, for status endpoints and CLI polling.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub state: LifecycleState,
    pub source: CaptureSource,
    pub elapsed_secs: u64,
    pub transcript: String,
    pub error: Option<String>,
}

pub struct SessionController {
    config: Config,
    store: Arc<SessionStore>,
    summarizer: Arc<dyn Summarizer>,
    state: Arc<Mutex<LifecycleState>>,
    transcript: Arc<Mutex<String>>,
    duration_secs: Arc<AtomicU64>,
    error_msg: Arc<Mutex<Option<String>>>,
    source: Arc<Mutex<CaptureSource>>,
    inner: tokio::sync::Mutex<ActiveParts>,
}

impl SessionController {
    pub fn new(config: Config, store: Arc<SessionStore>, summarizer: Arc<dyn Summarizer>) -> Self {
        Self {
            config,
            store,
            summarizer,
            state: Arc::new(Mutex::new(LifecycleState::Idle)),
            transcript: Arc::new(Mutex::new(String::new())),
            duration_secs: Arc::new(AtomicU64::new(0)),
            error_msg: Arc::new(Mutex::new(None)),
            source: Arc::new(Mutex::new(CaptureSource::Mic)),
            inner: tokio::sync::Mutex::new(ActiveParts::default()),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock().unwrap()
    }

    /// Apply a lifecycle event through the transition table. Returns the new
    /// state, or `None` if the event is not legal right now.
    fn apply(&self, event: LifecycleEvent) -> Option<LifecycleState> {
        let mut state = self.state.lock().unwrap();
        match transition(*state, event) {
            Some(next) => {
                debug!("lifecycle: {:?} + {:?} -> {:?}", *state, event, next);
                *state = next;
                Some(next)
            }
            None => None,
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            state: self.state(),
            source: *self.source.lock().unwrap(),
            elapsed_secs: self.duration_secs.load(Ordering::Relaxed),
            transcript: self.transcript.lock().unwrap().clone(),
            error: self.error_msg.lock().unwrap().clone(),
        }
    }

    /// Begin a new session on the given source. Fails if a session is already
    /// in flight, or if capture or the live connection cannot be brought up.
    pub async fn start(self: &Arc<Self>, source: CaptureSource) -> Result<()> {
        if self.apply(LifecycleEvent::Start).is_none() {
            bail!("a session is already in progress");
        }

        self.transcript.lock().unwrap().clear();
        self.duration_secs.store(0, Ordering::Relaxed);
        *self.error_msg.lock().unwrap() = None;
        *self.source.lock().unwrap() = source;

        // No credential, no connection attempt
        let api_key = match Config::gemini_api_key() {
            Ok(key) => key,
            Err(e) => return self.fail_start(e.to_string()),
        };

        let capture_config = CaptureConfig {
            target_sample_rate: self.config.audio.sample_rate,
            target_channels: self.config.audio.channels,
        };
        let mut capture = CaptureFactory::create(source, capture_config);
        let frames = match capture.start().await {
            Ok(rx) => rx,
            Err(e) => return self.fail_start(format!("{e:#}")),
        };

        let live_config = LiveClientConfig {
            endpoint: self.config.live.endpoint.clone(),
            model: self.config.live.model.clone(),
            api_key,
        };
        let (handle, events) = match live::connect(&live_config).await {
            Ok(pair) => pair,
            Err(e) => {
                if let Err(stop_err) = capture.stop().await {
                    warn!("failed to stop capture after connect error: {stop_err:#}");
                }
                return self.fail_start(format!("{e:#}"));
            }
        };

        info!("session starting on source '{}'", capture.name());

        let timer = tokio::spawn(Self::timer_task(
            self.state.clone(),
            self.duration_secs.clone(),
        ));

        {
            let mut inner = self.inner.lock().await;
            inner.capture = Some(capture);
            inner.live = Some(handle.clone());
            inner.timer = Some(timer);
        }

        tokio::spawn(self.clone().pump_task(frames, handle));
        tokio::spawn(self.clone().events_task(events));

        Ok(())
    }

    fn fail_start(&self, message: String) -> Result<()> {
        self.apply(LifecycleEvent::Fatal);
        *self.error_msg.lock().unwrap() = Some(message.clone());
        error!("failed to start session: {message}");
        bail!(message)
    }

    pub fn pause(&self) -> Result<()> {
        match self.apply(LifecycleEvent::Pause) {
            Some(_) => {
                info!("session paused");
                Ok(())
            }
            None => bail!("no active recording to pause"),
        }
    }

    pub fn resume(&self) -> Result<()> {
        match self.apply(LifecycleEvent::Resume) {
            Some(_) => {
                info!("session resumed");
                Ok(())
            }
            None => bail!("no paused recording to resume"),
        }
    }

    /// End the session: tear down capture and the connection, then summarize
    /// and persist. Returns the saved record, or `None` when the transcript
    /// was empty and nothing was written.
    pub async fn stop(self: &Arc<Self>) -> Result<Option<Session>> {
        if self.apply(LifecycleEvent::Stop).is_none() {
            bail!("no recording in progress");
        }

        self.teardown().await;

        let transcript = self.transcript.lock().unwrap().clone();
        let duration = self.duration_secs.load(Ordering::Relaxed);
        let source = *self.source.lock().unwrap();

        let result = finalize_session(
            &transcript,
            duration,
            source,
            self.summarizer.as_ref(),
            &self.store,
        )
        .await;

        match result {
            Ok(saved) => {
                self.apply(LifecycleEvent::Finished);
                Ok(saved)
            }
            Err(e) => {
                *self.error_msg.lock().unwrap() = Some(format!("{e:#}"));
                self.apply(LifecycleEvent::Fatal);
                Err(e)
            }
        }
    }

    /// Abort the session with an error message. Used when the live connection
    /// reports a failure mid-recording.
    async fn fail(self: &Arc<Self>, message: String) {
        if self.apply(LifecycleEvent::Fatal).is_none() {
            return;
        }
        error!("session failed: {message}");
        *self.error_msg.lock().unwrap() = Some(message);
        self.teardown().await;
    }

    async fn teardown(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        if let Some(mut capture) = inner.capture.take() {
            if let Err(e) = capture.stop().await {
                warn!("error stopping capture: {e:#}");
            }
        }
        // Dropping the handle closes the audio channel; the connection task
        // then sends a Close frame and drains the remaining server messages.
        inner.live.take();
    }

    /// Forwards captured frames to the live connection. Paused frames are
    /// discarded. When the frame channel closes while we still think we are
    /// recording, the device stopped underneath us and the session is ended
    /// as if the user pressed stop.
    async fn pump_task(
        self: Arc<Self>,
        mut frames: tokio::sync::mpsc::Receiver<crate::audio::AudioFrame>,
        live: LiveHandle,
    ) {
        let target_rate = self.config.audio.sample_rate;
        let target_channels = self.config.audio.channels;

        while let Some(frame) = frames.recv().await {
            match self.state() {
                LifecycleState::Paused => continue,
                LifecycleState::Recording | LifecycleState::Initializing => {
                    let frame = convert::process_frame(frame, target_rate, target_channels);
                    live.send_audio(encode_pcm16(&frame.samples));
                }
                _ => return,
            }
        }

        if self.state().is_active_recording() {
            info!("capture stream ended, stopping session");
            match self.stop().await {
                Ok(Some(session)) => info!("session '{}' saved", session.title),
                Ok(None) => info!("session ended with no transcript, nothing saved"),
                Err(e) => error!("failed to finalize session: {e:#}"),
            }
        }
    }

    async fn events_task(self: Arc<Self>, mut events: tokio::sync::mpsc::Receiver<LiveEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                LiveEvent::Opened => {
                    if self.apply(LifecycleEvent::Opened).is_some() {
                        info!("live connection ready, recording");
                    }
                }
                LiveEvent::Transcript(text) => {
                    self.transcript.lock().unwrap().push_str(&text);
                }
                LiveEvent::Closed => {
                    debug!("live connection closed");
                }
                LiveEvent::Error(message) => {
                    self.fail(message).await;
                    return;
                }
            }
        }
    }

    /// Counts elapsed recording time. Paused seconds do not accumulate; the
    /// task exits once the lifecycle leaves the recording states.
    async fn timer_task(state: Arc<Mutex<LifecycleState>>, duration: Arc<AtomicU64>) {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.tick().await;
        loop {
            interval.tick().await;
            match *state.lock().unwrap() {
                LifecycleState::Recording => {
                    duration.fetch_add(1, Ordering::Relaxed);
                }
                LifecycleState::Paused | LifecycleState::Initializing => {}
                _ => return,
            }
        }
    }
}

/// Turn a finished transcript into a stored session record.
///
/// An empty transcript produces no record at all. A summarization failure is
/// logged and the record is saved without a summary; only a store write error
/// propagates.
pub async fn finalize_session(
    transcript: &str,
    duration_secs: u64,
    source: CaptureSource,
    summarizer: &dyn Summarizer,
    store: &SessionStore,
) -> Result<Option<Session>> {
    if transcript.trim().is_empty() {
        info!("empty transcript, skipping save");
        return Ok(None);
    }

    let summary = match summarizer.summarize(transcript).await {
        Ok(result) => Some(result),
        Err(e) => {
            warn!("summarization failed, saving transcript without summary: {e:#}");
            None
        }
    };

    let session = Session::completed(transcript.to_string(), duration_secs, source, summary);
    store
        .save(&session)
        .context("failed to persist session")?;
    info!("session '{}' saved ({} seconds)", session.title, session.duration_seconds);
    Ok(Some(session))
}
