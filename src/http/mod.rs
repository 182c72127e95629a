//! HTTP API server for external control (the embedding UI)
//!
//! This module provides a REST API for controlling the conversation session:
//! - POST /session/start - Start the session
//! - POST /session/stop - Stop the session
//! - GET /session/status - Query session statistics
//! - GET /session/transcript - Get the retained transcript
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::{AppState, SessionBuilder};
