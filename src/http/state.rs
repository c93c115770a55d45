use crate::session::SessionController;
use crate::store::SessionStore;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The single recording session controller
    pub controller: Arc<SessionController>,
    /// Persisted session records
    pub store: Arc<SessionStore>,
}

impl AppState {
    pub fn new(controller: Arc<SessionController>, store: Arc<SessionStore>) -> Self {
        Self { controller, store }
    }
}
