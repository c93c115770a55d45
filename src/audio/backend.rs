use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::sync::mpsc;

/// Which capture method a session uses.
///
/// `System` is the native analogue of sharing a browser tab: it records
/// whatever the machine is playing (a meeting in any app) through a
/// loopback/monitor input instead of the microphone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSource {
    /// Microphone input (in-person meetings)
    Mic,
    /// System audio loopback (remote meetings playing on this machine)
    System,
}

impl fmt::Display for CaptureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureSource::Mic => write!(f, "mic"),
            CaptureSource::System => write!(f, "system"),
        }
    }
}

impl FromStr for CaptureSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mic" | "microphone" => Ok(CaptureSource::Mic),
            "system" | "loopback" => Ok(CaptureSource::System),
            _ => Err(format!("unknown capture source: {}. use 'mic' or 'system'", s)),
        }
    }
}

/// A block of captured audio, device-native format (f32, interleaved).
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw samples in [-1.0, 1.0], interleaved when multi-channel
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Which capture method produced this frame
    pub source: CaptureSource,
}

/// Configuration for audio capture backends.
#[derive(Debug, Clone, Copy)]
pub struct CaptureConfig {
    /// Preferred sample rate; the device is opened at this rate when it
    /// supports it, otherwise at its native rate (we resample downstream)
    pub target_sample_rate: u32,
    /// Target channel count after conversion (1 = mono)
    pub target_channels: u16,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000, // what the live service expects
            target_channels: 1,        // mono
        }
    }
}

/// Audio capture backend trait.
///
/// Implementations run the cpal stream on a dedicated thread and hand frames
/// over a channel; the channel closing before `stop` was called means the
/// stream ended externally (device unplugged, monitor source gone).
#[async_trait::async_trait]
pub trait AudioCapture: Send {
    /// Start capturing audio.
    ///
    /// Returns a channel receiver that will receive audio frames.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio. Idempotent.
    async fn stop(&mut self) -> Result<()>;

    /// Check if the backend is currently capturing.
    fn is_capturing(&self) -> bool;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Capture backend factory.
pub struct CaptureFactory;

impl CaptureFactory {
    pub fn create(source: CaptureSource, config: CaptureConfig) -> Box<dyn AudioCapture> {
        match source {
            CaptureSource::Mic => Box::new(super::mic::MicCapture::new(config)),
            CaptureSource::System => Box::new(super::system::SystemCapture::new(config)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_source_round_trips_through_serde() {
        let json = serde_json::to_string(&CaptureSource::Mic).unwrap();
        assert_eq!(json, r#""mic""#);
        let json = serde_json::to_string(&CaptureSource::System).unwrap();
        assert_eq!(json, r#""system""#);

        let parsed: CaptureSource = serde_json::from_str(r#""system""#).unwrap();
        assert_eq!(parsed, CaptureSource::System);
    }

    #[test]
    fn capture_source_parses_from_cli_strings() {
        assert_eq!("mic".parse::<CaptureSource>().unwrap(), CaptureSource::Mic);
        assert_eq!(
            "loopback".parse::<CaptureSource>().unwrap(),
            CaptureSource::System
        );
        assert!("tab".parse::<CaptureSource>().is_err());
    }
}
