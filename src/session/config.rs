use serde::{Deserialize, Serialize};

use crate::config::{Config, Language};

/// Configuration for a conversation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "advisor-2026-03-12-consult")
    pub session_id: String,

    /// Conversation language; drives prompt, recognizer locale, and voice
    pub language: Language,

    /// Most recent transcript entries retained and sent as history
    pub history_limit: usize,

    /// Capture sample rate (the live endpoint expects 16 kHz)
    pub input_sample_rate: u32,

    /// Playback sample rate for returned audio fragments
    pub output_sample_rate: u32,

    /// Number of audio channels (1 = mono)
    pub channels: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("advisor-{}", uuid::Uuid::new_v4()),
            language: Language::Fr,
            history_limit: 10,
            input_sample_rate: 16000, // Live endpoint expects 16kHz input
            output_sample_rate: 24000, // Returned audio is 24kHz
            channels: 1,              // Mono
        }
    }
}

impl SessionConfig {
    /// Derive a session configuration from the service configuration
    pub fn from_service(config: &Config, language: Language) -> Self {
        Self {
            session_id: format!("advisor-{}", uuid::Uuid::new_v4()),
            language,
            history_limit: config.conversation.history_limit,
            input_sample_rate: config.audio.input_sample_rate,
            output_sample_rate: config.audio.output_sample_rate,
            channels: config.audio.channels,
        }
    }
}
