//! Speech capture adapters
//!
//! Two variants behind one contract so the session controller is agnostic to
//! which is active:
//! - `StreamingCapture`: continuous raw-audio chunks for the live duplex
//!   channel
//! - `UtteranceCapture`: discrete finalized utterances from a speech
//!   recognizer, auto-restarting between cycles
//!
//! Device access (microphone, recognizer) is injected behind capability
//! traits rather than reached for ambiently, so tests can substitute fakes.

mod recognizer;
mod streaming;

pub use recognizer::{RecognizerEvent, SpeechRecognizer, UtteranceCapture};
pub use streaming::{Microphone, StreamingCapture};

use anyhow::Result;
use tokio::sync::mpsc;

use crate::audio::AudioChunk;
use crate::error::CaptureError;

/// Event emitted by a capture adapter
#[derive(Debug)]
pub enum CaptureEvent {
    /// A fixed-size PCM chunk (streaming variant)
    Chunk(AudioChunk),
    /// One finalized utterance (utterance variant)
    Utterance(String),
    /// A capture failure; recoverable errors do not end the session
    Error(CaptureError),
}

/// Speech capture contract shared by both variants
#[async_trait::async_trait]
pub trait SpeechCapture: Send + Sync {
    /// Start capturing
    ///
    /// Returns a channel receiver that will receive capture events
    async fn begin(&mut self) -> Result<mpsc::Receiver<CaptureEvent>, CaptureError>;

    /// Stop capturing and release the underlying device
    async fn end(&mut self) -> Result<(), CaptureError>;

    /// Pause listening while a backend call is in flight
    async fn suspend(&mut self);

    /// Resume listening after playback completes
    async fn resume(&mut self);

    /// Check if the adapter is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get adapter name for logging
    fn name(&self) -> &str;
}
