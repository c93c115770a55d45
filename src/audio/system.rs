use anyhow::Result;
use tokio::sync::mpsc;

use super::backend::{AudioCapture, AudioFrame, CaptureConfig, CaptureSource};
use super::stream::{self, CaptureThread, DeviceSelector};

/// System-audio capture through a loopback/monitor input.
///
/// The monitor source carries the mixed meeting output as-is; no voice
/// processing (echo cancellation, noise suppression, gain) runs on this path.
pub struct SystemCapture {
    config: CaptureConfig,
    thread: Option<CaptureThread>,
}

impl SystemCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            thread: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioCapture for SystemCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let (tx, rx) = mpsc::channel(64);

        let thread = stream::spawn(
            DeviceSelector::Monitor,
            CaptureSource::System,
            self.config.target_sample_rate,
            tx,
        )
        .await?;

        self.thread = Some(thread);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(mut thread) = self.thread.take() {
            thread.stop().await?;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.thread.is_some()
    }

    fn name(&self) -> &str {
        "system"
    }
}
