use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::debug;

use super::{OutputPayload, SpeechOutput};
use crate::config::Language;
use crate::error::PlaybackError;

/// Text-to-speech capability consumed by the synthesis player.
pub trait SpeechSynthesizer: Send + Sync {
    /// Start speaking the text; the receiver resolves when the utterance ends
    fn speak(
        &self,
        text: &str,
        language: Language,
    ) -> Result<oneshot::Receiver<()>, PlaybackError>;

    /// Cancel the current utterance, if any
    fn cancel(&self);
}

/// Synthesized-speech output for the discrete variant.
///
/// At most one utterance speaks at a time: any prior utterance is cancelled
/// before a new one starts.
pub struct SynthesisPlayer {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    language: Language,
}

impl SynthesisPlayer {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, language: Language) -> Self {
        Self {
            synthesizer,
            language,
        }
    }
}

#[async_trait::async_trait]
impl SpeechOutput for SynthesisPlayer {
    async fn play(&self, payload: OutputPayload) -> Result<oneshot::Receiver<()>, PlaybackError> {
        let text = match payload {
            OutputPayload::Text(text) => text,
            OutputPayload::Audio { .. } => {
                return Err(PlaybackError::UnsupportedPayload(
                    "synthesis player only speaks text",
                ))
            }
        };

        self.synthesizer.cancel();
        debug!("Synthesizing reply ({} chars)", text.len());

        self.synthesizer.speak(&text, self.language)
    }

    async fn cancel_all(&self) {
        self.synthesizer.cancel();
    }
}
