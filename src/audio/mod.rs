pub mod backend;
pub mod convert;
pub mod encode;
pub mod mic;
pub mod system;

pub(crate) mod stream;

pub use backend::{AudioCapture, AudioFrame, CaptureConfig, CaptureFactory, CaptureSource};
pub use encode::{encode_pcm16, AudioPayload, PCM_MIME_TYPE};
