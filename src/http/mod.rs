//! HTTP API for external control of the recorder
//!
//! - POST /record/start - Begin a recording session
//! - POST /record/pause - Pause streaming and the timer
//! - POST /record/resume - Resume a paused session
//! - POST /record/stop - Finalize, summarize, and persist
//! - GET /record/status - Live session snapshot
//! - GET /sessions - List stored sessions
//! - GET /sessions/:id - Fetch one session record
//! - DELETE /sessions/:id - Remove a session record
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
