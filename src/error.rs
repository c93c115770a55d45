use thiserror::Error;

/// Errors that abort a recording lifecycle.
///
/// These carry the exact message shown to the user; everything else in the
/// crate flows through `anyhow` with context. Summarization failures do not
/// appear here: they are soft, logged and swallowed.
#[derive(Debug, Error)]
pub enum ScribeError {
    /// The platform refused to open the capture stream.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// No usable audio input was found for the selected source.
    #[error("No audio captured. {0}")]
    NoAudioInput(String),

    /// The credential is missing. There is no embedded fallback key.
    #[error("GEMINI_API_KEY is not set. export it before recording")]
    MissingApiKey,

    /// The live transcription connection failed or could not be established.
    #[error("Connection to the transcription service failed: {0}")]
    Connection(String),

    /// The session store could not be written.
    #[error("Failed to save session: {0}")]
    Persistence(String),
}
