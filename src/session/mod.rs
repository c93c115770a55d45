//! Session lifecycle, records, and orchestration.

pub mod controller;
pub mod record;
pub mod state;

pub use controller::{finalize_session, SessionController, StatusSnapshot};
pub use record::{Session, SessionStatus};
pub use state::{transition, LifecycleEvent, LifecycleState};
