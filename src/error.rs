//! Error taxonomy for the capture, playback, and gateway layers.
//!
//! The session controller only distinguishes recoverable capture errors
//! (listening continues) from fatal ones (the session ends); everything else
//! is propagated for logging.

use thiserror::Error;

/// Failure in the speech capture path
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Microphone or recognizer access was denied; the session stays idle
    #[error("capture capability unavailable: permission denied")]
    PermissionDenied,

    /// The recognizer finished a cycle without hearing anything.
    /// Recoverable: recognition restarts and the session keeps listening.
    #[error("no speech detected")]
    NoSpeech,

    /// The capture device failed or disappeared
    #[error("capture device error: {0}")]
    Device(String),

    /// The speech recognizer reported a failure
    #[error("speech recognition error: {0}")]
    Recognizer(String),
}

impl CaptureError {
    /// Whether the session can keep listening after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CaptureError::NoSpeech)
    }
}

/// Failure in the speech output path
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The audio sink rejected or lost a scheduled source
    #[error("audio sink error: {0}")]
    Sink(String),

    /// Speech synthesis failed
    #[error("speech synthesis error: {0}")]
    Synthesis(String),

    /// The payload kind does not match the adapter variant
    #[error("unsupported payload: {0}")]
    UnsupportedPayload(&'static str),
}

/// Failure in the backend exchange
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The utterance was empty after trimming
    #[error("message is required")]
    InvalidInput,

    /// The backend answered with a non-success status
    #[error("backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    /// The HTTP request itself failed
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The live duplex channel failed
    #[error("live channel error: {0}")]
    Channel(String),
}
