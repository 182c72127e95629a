use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{BackendConfig, Language};
use crate::error::GatewayError;
use crate::session::TurnRecord;

/// Completion backend consumed by the session controller in discrete mode.
#[async_trait::async_trait]
pub trait AdviceBackend: Send + Sync {
    /// Send one utterance plus bounded history; returns the generated reply
    async fn send(
        &self,
        utterance: &str,
        history: &[TurnRecord],
        language: Language,
    ) -> Result<String, GatewayError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    history: Vec<WireTurn<'a>>,
    lang: &'static str,
}

#[derive(Debug, Serialize)]
struct WireTurn<'a> {
    role: &'static str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ChatErrorBody {
    error: String,
}

/// HTTP gateway to the completion endpoint.
///
/// No retry: a non-success response is surfaced as-is and the caller decides
/// whether to abort the session.
pub struct ChatGateway {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl ChatGateway {
    pub fn new(config: &BackendConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        info!("Chat gateway targeting {}", config.chat_url);

        Ok(Self {
            client,
            url: config.chat_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait::async_trait]
impl AdviceBackend for ChatGateway {
    async fn send(
        &self,
        utterance: &str,
        history: &[TurnRecord],
        language: Language,
    ) -> Result<String, GatewayError> {
        let message = utterance.trim();
        if message.is_empty() {
            return Err(GatewayError::InvalidInput);
        }

        // Entries with empty text are never transmitted.
        let history: Vec<WireTurn> = history
            .iter()
            .filter(|turn| !turn.text.trim().is_empty())
            .map(|turn| WireTurn {
                role: turn.speaker.wire_role(),
                text: &turn.text,
            })
            .collect();

        debug!(
            "Sending utterance ({} chars, {} history turns)",
            message.len(),
            history.len()
        );

        let mut request = self.client.post(&self.url).json(&ChatRequest {
            message,
            history,
            lang: language.as_str(),
        });

        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .json::<ChatErrorBody>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown backend failure")
                        .to_string()
                });

            return Err(GatewayError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        let reply: ChatReply = response.json().await?;

        Ok(reply.text)
    }
}
