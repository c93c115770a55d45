//! File-backed session store.
//!
//! The entire list lives as one JSON array in one namespaced file, newest
//! session first. Reads never fail: a missing or corrupt file is an empty
//! list. There is no migration, versioning, or multi-writer handling; this
//! is a single-user, single-process store.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::error::ScribeError;
use crate::session::Session;

const STORE_DIR: &str = "scribe-meetings";
const STORE_FILE: &str = "sessions_v1.json";

pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default store location in the platform data directory.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(STORE_DIR)
            .join(STORE_FILE)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// All stored sessions, newest first. Never errors.
    pub fn list(&self) -> Vec<Session> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) => {
                debug!("session store not readable ({}); treating as empty", e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&data) {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!(
                    "session store at {} is corrupt ({}); treating as empty",
                    self.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Upsert a session: an existing id is replaced in place, a new one is
    /// prepended so listings stay newest-first.
    pub fn save(&self, session: &Session) -> Result<()> {
        let mut sessions = self.list();

        match sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session.clone(),
            None => sessions.insert(0, session.clone()),
        }

        self.write_all(&sessions)
    }

    /// Look up one session by id.
    pub fn get(&self, id: &str) -> Option<Session> {
        self.list().into_iter().find(|s| s.id == id)
    }

    /// Delete a session permanently. Returns whether the id existed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let sessions = self.list();
        let before = sessions.len();
        let remaining: Vec<Session> = sessions.into_iter().filter(|s| s.id != id).collect();
        let found = remaining.len() != before;

        self.write_all(&remaining)?;
        Ok(found)
    }

    fn write_all(&self, sessions: &[Session]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ScribeError::Persistence(format!(
                    "could not create store directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let data = serde_json::to_string(sessions).context("could not serialize sessions")?;
        fs::write(&self.path, data).map_err(|e| {
            ScribeError::Persistence(format!(
                "could not write session store {}: {}",
                self.path.display(),
                e
            ))
        })?;

        Ok(())
    }
}
