//! Conversation session management
//!
//! This module provides the `ConversationSession` state machine that
//! coordinates:
//! - Speech capture (streaming audio or discrete recognition)
//! - The call/response cycle with the model backend
//! - Speech playback of the reply
//! - The bounded rolling transcript
//! - Lifecycle, teardown, and session statistics

mod config;
mod controller;
mod stats;
mod transcript;

pub use config::SessionConfig;
pub use controller::ConversationSession;
pub use stats::{SessionStats, SessionStatus};
pub use transcript::{Speaker, Transcript, TurnRecord};
