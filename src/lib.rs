pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod live;
pub mod session;
pub mod store;
pub mod summary;

pub use audio::{
    encode_pcm16, AudioCapture, AudioFrame, AudioPayload, CaptureConfig, CaptureFactory,
    CaptureSource,
};
pub use config::Config;
pub use error::ScribeError;
pub use http::{create_router, AppState};
pub use live::{LiveClientConfig, LiveEvent, LiveHandle};
pub use session::{
    finalize_session, Session, SessionController, SessionStatus, StatusSnapshot,
};
pub use store::SessionStore;
pub use summary::{GeminiSummarizer, Summarizer, SummaryResult};
