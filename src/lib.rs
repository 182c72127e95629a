pub mod audio;
pub mod capture;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod playback;
pub mod session;

pub use audio::{AudioBuffer, AudioChunk};
pub use capture::{
    CaptureEvent, Microphone, RecognizerEvent, SpeechCapture, SpeechRecognizer, StreamingCapture,
    UtteranceCapture,
};
pub use config::{Config, Language};
pub use error::{CaptureError, GatewayError, PlaybackError};
pub use gateway::{
    AdviceBackend, ChatGateway, LiveChannel, LiveClient, LiveConversation, ServerEvent,
};
pub use http::{create_router, AppState, SessionBuilder};
pub use playback::{
    AudioSink, OutputPayload, SpeechOutput, SpeechSynthesizer, StreamPlayer, SynthesisPlayer,
};
pub use session::{
    ConversationSession, SessionConfig, SessionStats, SessionStatus, Speaker, TurnRecord,
};
