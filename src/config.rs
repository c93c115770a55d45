use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;

use crate::error::ScribeError;

/// Default Gemini Live bidi endpoint (WebSocket).
pub const DEFAULT_LIVE_ENDPOINT: &str =
    "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Default Gemini REST endpoint (summaries).
pub const DEFAULT_API_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const DEFAULT_LIVE_MODEL: &str = "models/gemini-2.5-flash-native-audio-preview-09-2025";
pub const DEFAULT_SUMMARY_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioSettings,
    pub live: LiveSettings,
    pub summary: SummarySettings,
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub bind: String,
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "scribe-meetings".to_string(),
            bind: "127.0.0.1".to_string(),
            port: 3030,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Sample rate the live service expects (Hz)
    pub sample_rate: u32,
    /// Channel count sent to the live service (1 = mono)
    pub channels: u16,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LiveSettings {
    pub endpoint: String,
    pub model: String,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_LIVE_ENDPOINT.to_string(),
            model: DEFAULT_LIVE_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SummarySettings {
    pub endpoint: String,
    pub model: String,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_API_ENDPOINT.to_string(),
            model: DEFAULT_SUMMARY_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StorageSettings {
    /// Override for the session store file (defaults to the platform data dir)
    pub path: Option<String>,
}

impl Config {
    /// Load configuration from an optional TOML file plus `SCRIBE__*`
    /// environment overrides. Every field has a default, so running with no
    /// config file at all is fine.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        builder = match path {
            Some(p) => builder.add_source(config::File::with_name(p)),
            None => {
                builder.add_source(config::File::with_name("config/scribe-meetings").required(false))
            }
        };

        let settings = builder
            .add_source(config::Environment::with_prefix("SCRIBE").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Resolved path of the session store file.
    pub fn store_path(&self) -> PathBuf {
        match &self.storage.path {
            Some(p) => PathBuf::from(p),
            None => crate::store::SessionStore::default_path(),
        }
    }

    /// The Gemini credential, read from the environment at the moment it is
    /// needed. There is deliberately no embedded fallback key.
    pub fn gemini_api_key() -> Result<String, ScribeError> {
        std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ScribeError::MissingApiKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_section() {
        let cfg = Config::default();
        assert_eq!(cfg.audio.sample_rate, 16000);
        assert_eq!(cfg.audio.channels, 1);
        assert_eq!(cfg.service.port, 3030);
        assert!(cfg.live.endpoint.starts_with("wss://"));
        assert!(cfg.summary.endpoint.starts_with("https://"));
        assert!(cfg.storage.path.is_none());
    }

    #[test]
    fn store_path_honors_override() {
        let mut cfg = Config::default();
        cfg.storage.path = Some("/tmp/scribe-test/sessions.json".to_string());
        assert_eq!(
            cfg.store_path(),
            PathBuf::from("/tmp/scribe-test/sessions.json")
        );
    }
}
