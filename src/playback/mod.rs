//! Speech output adapters
//!
//! Two variants behind one contract:
//! - `StreamPlayer`: gapless, strictly ordered playback of decoded audio
//!   fragments (live variant)
//! - `SynthesisPlayer`: text-to-speech of a complete reply (discrete variant)

mod stream;
mod synthesis;

pub use stream::{AudioSink, ScheduledSource, SourceId, StreamPlayer};
pub use synthesis::{SpeechSynthesizer, SynthesisPlayer};

use tokio::sync::oneshot;

use crate::error::PlaybackError;

/// Payload handed to an output adapter
#[derive(Debug, Clone)]
pub enum OutputPayload {
    /// One decoded-audio fragment (PCM16 bytes) from the live channel
    Audio {
        pcm: Vec<u8>,
        sample_rate: u32,
        channels: u16,
    },
    /// A complete reply to synthesize
    Text(String),
}

/// Speech output contract shared by both variants.
///
/// `play` schedules the payload and returns a receiver that resolves when
/// playback of the session's pending output has finished; the controller uses
/// it to transition back to listening. `cancel_all` stops everything
/// immediately and must be safe to call from any state.
#[async_trait::async_trait]
pub trait SpeechOutput: Send + Sync {
    async fn play(&self, payload: OutputPayload) -> Result<oneshot::Receiver<()>, PlaybackError>;

    async fn cancel_all(&self);
}
