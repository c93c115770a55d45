pub mod client;
pub mod protocol;

pub use client::{connect, LiveClientConfig, LiveEvent, LiveHandle};
pub use protocol::SYSTEM_INSTRUCTION;
