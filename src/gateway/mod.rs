//! Backend gateway
//!
//! Two exchange modes with the hosted model:
//! - `ChatGateway`: one HTTP POST per utterance, returning generated text
//! - `LiveClient`: a persistent duplex websocket carrying raw audio out and
//!   interleaved transcript/audio/turn events back

mod http;
mod live;

pub use http::{AdviceBackend, ChatGateway};
pub use live::{parse_server_frame, LiveChannel, LiveClient, LiveConversation, ServerEvent};
