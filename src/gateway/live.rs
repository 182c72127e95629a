use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::audio::{codec, AudioChunk};
use crate::config::{BackendConfig, Language};
use crate::error::GatewayError;

/// Event decoded from an inbound server frame
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Fragment of the user's own speech, transcribed by the model
    UserTranscript(String),
    /// Fragment of the model's reply transcript
    AdvisorTranscript(String),
    /// One decoded PCM16 audio fragment of the model's reply
    Audio(Vec<u8>),
    /// The model finished its turn
    TurnComplete,
    /// The user barged in; pending playback must be dropped
    Interrupted,
}

/// An open duplex conversation: raw audio out, server events in.
///
/// Dropping `outbound` closes the channel; the writer task then sends a
/// websocket close frame.
pub struct LiveConversation {
    pub outbound: mpsc::Sender<AudioChunk>,
    pub inbound: mpsc::Receiver<ServerEvent>,
}

/// Live duplex capability consumed by the session controller in live mode.
#[async_trait::async_trait]
pub trait LiveChannel: Send + Sync {
    async fn connect(&self, language: Language) -> Result<LiveConversation, GatewayError>;
}

// ============================================================================
// Wire frames
// ============================================================================

#[derive(Debug, Serialize)]
struct SetupFrame<'a> {
    setup: SetupBody<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetupBody<'a> {
    system_instruction: &'a str,
    voice_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RealtimeInputFrame {
    realtime_input: RealtimeInput,
}

#[derive(Debug, Serialize)]
struct RealtimeInput {
    media: MediaBlob,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MediaBlob {
    data: String,
    mime_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerFrame {
    server_content: Option<ServerContent>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ServerContent {
    input_transcription: Option<TranscriptionPart>,
    output_transcription: Option<TranscriptionPart>,
    model_turn: Option<ModelTurn>,
    turn_complete: Option<bool>,
    interrupted: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionPart {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelTurn {
    audio_data: Option<String>,
}

/// Decode one inbound text frame into zero or more events.
///
/// A single frame may interleave a transcript fragment, an audio fragment,
/// and a turn marker; events come out in that order.
pub fn parse_server_frame(text: &str) -> Result<Vec<ServerEvent>, GatewayError> {
    let frame: ServerFrame =
        serde_json::from_str(text).map_err(|e| GatewayError::Channel(e.to_string()))?;

    let mut events = Vec::new();

    let Some(content) = frame.server_content else {
        return Ok(events);
    };

    if let Some(part) = content.input_transcription {
        events.push(ServerEvent::UserTranscript(part.text));
    }

    if let Some(part) = content.output_transcription {
        events.push(ServerEvent::AdvisorTranscript(part.text));
    }

    if let Some(turn) = content.model_turn {
        if let Some(data) = turn.audio_data {
            let pcm =
                codec::from_wire(&data).map_err(|e| GatewayError::Channel(e.to_string()))?;
            events.push(ServerEvent::Audio(pcm));
        }
    }

    if content.turn_complete == Some(true) {
        events.push(ServerEvent::TurnComplete);
    }

    if content.interrupted == Some(true) {
        events.push(ServerEvent::Interrupted);
    }

    Ok(events)
}

// ============================================================================
// Client
// ============================================================================

/// Websocket client for the streaming model endpoint.
pub struct LiveClient {
    url: String,
    api_key: Option<String>,
}

impl LiveClient {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            url: config.live_url.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait::async_trait]
impl LiveChannel for LiveClient {
    async fn connect(&self, language: Language) -> Result<LiveConversation, GatewayError> {
        let url = match &self.api_key {
            Some(key) => format!("{}?key={}", self.url, key),
            None => self.url.clone(),
        };

        info!("Connecting live channel ({})", language.as_str());

        let (stream, _) = connect_async(&url)
            .await
            .map_err(|e| GatewayError::Channel(e.to_string()))?;

        let (mut writer, mut reader) = stream.split();

        let setup = serde_json::to_string(&SetupFrame {
            setup: SetupBody {
                system_instruction: language.system_instruction(),
                voice_name: language.voice_name(),
            },
        })
        .map_err(|e| GatewayError::Channel(e.to_string()))?;

        writer
            .send(Message::from(setup))
            .await
            .map_err(|e| GatewayError::Channel(e.to_string()))?;

        let (out_tx, mut out_rx) = mpsc::channel::<AudioChunk>(64);
        let (in_tx, in_rx) = mpsc::channel::<ServerEvent>(64);

        // Writer: forward captured chunks as base64 PCM frames until the
        // outbound side is dropped, then close the socket.
        tokio::spawn(async move {
            while let Some(chunk) = out_rx.recv().await {
                let pcm = codec::pcm_bytes(&chunk.samples);
                let frame = RealtimeInputFrame {
                    realtime_input: RealtimeInput {
                        media: MediaBlob {
                            data: codec::to_wire(&pcm),
                            mime_type: format!("audio/pcm;rate={}", chunk.sample_rate),
                        },
                    },
                };

                let json = match serde_json::to_string(&frame) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to encode outbound frame: {}", e);
                        continue;
                    }
                };

                if writer.send(Message::from(json)).await.is_err() {
                    break;
                }
            }

            let _ = writer.send(Message::Close(None)).await;
            debug!("Live writer task stopped");
        });

        // Reader: decode inbound frames into events. Dropping the sender on
        // exit lets the controller observe the channel closing.
        tokio::spawn(async move {
            while let Some(message) = reader.next().await {
                match message {
                    Ok(Message::Text(text)) => match parse_server_frame(text.as_str()) {
                        Ok(events) => {
                            for event in events {
                                if in_tx.send(event).await.is_err() {
                                    return;
                                }
                            }
                        }
                        Err(e) => warn!("Dropping malformed server frame: {}", e),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Live channel read failed: {}", e);
                        break;
                    }
                }
            }

            debug!("Live reader task stopped");
        });

        Ok(LiveConversation {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}
