use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Conversation language. Drives the backend system prompt, the recognizer
/// locale, and the synthesis voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Fr,
    En,
}

impl Default for Language {
    fn default() -> Self {
        Language::Fr
    }
}

impl Language {
    /// Wire value sent to the backend (`lang` field)
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Fr => "fr",
            Language::En => "en",
        }
    }

    /// Locale handed to the speech recognizer
    pub fn recognizer_locale(&self) -> &'static str {
        match self {
            Language::Fr => "fr-FR",
            Language::En => "en-US",
        }
    }

    /// Prebuilt voice used by the live audio endpoint
    pub fn voice_name(&self) -> &'static str {
        match self {
            Language::Fr => "Kore",
            Language::En => "Zephyr",
        }
    }

    /// System instruction for the live endpoint's setup frame
    pub fn system_instruction(&self) -> &'static str {
        match self {
            Language::Fr => {
                "Tu es un conseiller financier expert international. \
                 Tes réponses doivent être détaillées et instructives, mais reste concis \
                 pour ne pas que le flux audio soit trop long. Explique les concepts \
                 clairement en 3 à 5 phrases maximum par point. Priorise les informations \
                 les plus importantes. Adapte-toi au pays de l'utilisateur (Afrique, \
                 Amérique, Europe). Utilise le FCFA pour le Bénin et l'Afrique de l'Ouest, \
                 le Dollar pour les USA. Sois encourageant et précis."
            }
            Language::En => {
                "You are an international financial expert advisor. Your answers should \
                 be detailed and educational, but keep them concise enough so the audio \
                 stream doesn't get cut off. Explain concepts clearly in 3 to 5 sentences \
                 max per point. Prioritize the most important information first. Adapt to \
                 the user's region (Africa, America, Europe). Use FCFA for West \
                 Africa/Benin, and Dollar for the USA. Be encouraging and precise."
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub backend: BackendConfig,
    pub audio: AudioConfig,
    pub conversation: ConversationConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    /// Completion endpoint for the discrete variant
    pub chat_url: String,
    /// Streaming endpoint for the live variant
    pub live_url: String,
    /// Upstream provider API key; set via ADVISOR_BACKEND__API_KEY
    pub api_key: Option<String>,
    /// Timeout around each backend call
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    /// Capture sample rate (the live endpoint expects 16 kHz)
    pub input_sample_rate: u32,
    /// Playback sample rate for returned audio (24 kHz)
    pub output_sample_rate: u32,
    pub channels: u16,
}

#[derive(Debug, Deserialize)]
pub struct ConversationConfig {
    pub language: Language,
    /// Most recent transcript entries kept and sent as history
    pub history_limit: usize,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("ADVISOR").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
