use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::state::AppState;
use crate::config::Language;
use crate::session::{SessionStats, TurnRecord};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct StartSessionRequest {
    /// Conversation language (default: service configuration)
    pub language: Option<Language>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /session/start
/// Start the conversation session (at most one active at a time)
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> impl IntoResponse {
    let language = req.language.unwrap_or_default();

    // The write lock is held across check, build, start, and store so
    // concurrent starts serialize: the loser observes the winner's session
    // and gets a conflict instead of overwriting it.
    let mut slot = state.session.write().await;

    if let Some(existing) = slot.as_ref() {
        if existing.is_active() {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: format!("Session {} is already active", existing.session_id()),
                }),
            )
                .into_response();
        }
    }

    let session = match state.builder.build(language).await {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to build session: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to build session: {}", e),
                }),
            )
                .into_response();
        }
    };

    if let Err(e) = session.start().await {
        error!("Failed to start session: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Failed to start session: {}", e),
            }),
        )
            .into_response();
    }

    // start() is a silent no-op when the capture capability is unavailable;
    // surface that to the API caller instead of pretending to listen.
    if !session.is_active() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "Capture capability unavailable".to_string(),
            }),
        )
            .into_response();
    }

    let session_id = session.session_id().to_string();
    *slot = Some(session);

    info!("Session started via control API: {}", session_id);

    (
        StatusCode::OK,
        Json(StartSessionResponse {
            session_id: session_id.clone(),
            status: "listening".to_string(),
            message: format!("Session {} started", session_id),
        }),
    )
        .into_response()
}

/// POST /session/stop
/// Stop the conversation session
pub async fn stop_session(State(state): State<AppState>) -> impl IntoResponse {
    let session = {
        let mut slot = state.session.write().await;
        slot.take()
    };

    match session {
        Some(session) => {
            let stats = session.stop().await;
            let session_id = session.session_id().to_string();

            info!("Session stopped via control API: {}", session_id);

            (
                StatusCode::OK,
                Json(StopSessionResponse {
                    session_id,
                    status: "idle".to_string(),
                    message: "Session stopped".to_string(),
                    stats,
                }),
            )
                .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No session to stop".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /session/status
/// Get statistics for the current session
pub async fn get_session_status(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;

    match session.as_ref() {
        Some(session) => (StatusCode::OK, Json(session.stats().await)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No session".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /session/transcript
/// Get the retained transcript for the current session
pub async fn get_session_transcript(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;

    match session.as_ref() {
        Some(session) => {
            let transcript: Vec<TurnRecord> = session.transcript().await;
            (StatusCode::OK, Json(transcript)).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No session".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
