use super::state::AppState;
use crate::audio::CaptureSource;
use crate::session::Session;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct StartRecordingRequest {
    /// Capture source (defaults to the microphone)
    pub source: Option<CaptureSource>,
}

#[derive(Debug, Serialize)]
pub struct RecordingResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StopRecordingResponse {
    /// The persisted record, absent when the transcript was empty
    pub saved: Option<Session>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /sessions
/// List all stored sessions, newest first
pub async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    let sessions = state.store.list();
    (StatusCode::OK, Json(sessions)).into_response()
}

/// GET /sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get(&id) {
        Some(session) => (StatusCode::OK, Json(session)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Session {} not found", id),
            }),
        )
            .into_response(),
    }
}

/// DELETE /sessions/:id
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.delete(&id) {
        Ok(true) => {
            info!("Deleted session {}", id);
            (
                StatusCode::OK,
                Json(RecordingResponse {
                    status: "deleted".to_string(),
                    message: format!("Session {} deleted", id),
                }),
            )
                .into_response()
        }
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Session {} not found", id),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to delete session: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to delete session: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// POST /record/start
/// Begin a new recording session
pub async fn start_recording(
    State(state): State<AppState>,
    req: Option<Json<StartRecordingRequest>>,
) -> impl IntoResponse {
    let source = req
        .map(|Json(r)| r.source)
        .flatten()
        .unwrap_or(CaptureSource::Mic);

    info!("Starting recording on source: {}", source);

    match state.controller.start(source).await {
        Ok(()) => (
            StatusCode::OK,
            Json(RecordingResponse {
                status: "initializing".to_string(),
                message: format!("Recording started on {}", source),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to start recording: {}", e);
            (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: format!("Failed to start recording: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// POST /record/pause
pub async fn pause_recording(State(state): State<AppState>) -> impl IntoResponse {
    match state.controller.pause() {
        Ok(()) => (
            StatusCode::OK,
            Json(RecordingResponse {
                status: "paused".to_string(),
                message: "Recording paused".to_string(),
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// POST /record/resume
pub async fn resume_recording(State(state): State<AppState>) -> impl IntoResponse {
    match state.controller.resume() {
        Ok(()) => (
            StatusCode::OK,
            Json(RecordingResponse {
                status: "recording".to_string(),
                message: "Recording resumed".to_string(),
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// POST /record/stop
/// Stop the recording, summarize, and persist
pub async fn stop_recording(State(state): State<AppState>) -> impl IntoResponse {
    info!("Stopping recording");

    match state.controller.stop().await {
        Ok(Some(session)) => (
            StatusCode::OK,
            Json(StopRecordingResponse {
                message: format!("Session '{}' saved", session.title),
                saved: Some(session),
            }),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::OK,
            Json(StopRecordingResponse {
                saved: None,
                message: "No speech captured, nothing saved".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to stop recording: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to stop recording: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// GET /record/status
/// Live view of the current session
pub async fn record_status(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.controller.snapshot())).into_response()
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
