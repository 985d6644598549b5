use super::state::AppState;
use crate::error::{CaptureError, ErrorResponse, SessionError};
use crate::session::{SessionController, SessionView, Transition};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use tracing::{info, warn};

// ============================================================================
// Responses
// ============================================================================

fn error_status(error: &SessionError) -> StatusCode {
    match error {
        SessionError::Capture(CaptureError::UnsupportedPlatform(_)) => StatusCode::NOT_IMPLEMENTED,
        SessionError::Capture(CaptureError::PermissionDenied(_)) => StatusCode::FORBIDDEN,
        SessionError::Capture(CaptureError::UserCancelled) => StatusCode::CONFLICT,
        SessionError::Capture(CaptureError::DeviceUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        SessionError::Recorder(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failed(error: &SessionError) -> Response {
    (error_status(error), Json(ErrorResponse::from(error))).into_response()
}

fn ignored(view: &SessionView, action: &str) -> Response {
    warn!("{} ignored, session {} is {:?}", action, view.session_id, view.state);

    (
        StatusCode::CONFLICT,
        Json(ErrorResponse {
            code: "CONTROL_DISABLED".to_string(),
            error: format!("cannot {} while session is {:?}", action, view.state).to_lowercase(),
        }),
    )
        .into_response()
}

fn respond(
    session: &SessionController,
    action: &str,
    result: Result<Transition, SessionError>,
) -> Response {
    match result {
        Ok(Transition::Applied) => (StatusCode::OK, Json(session.view())).into_response(),
        Ok(Transition::Ignored) => ignored(&session.view(), action),
        Err(e) => failed(&e),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /session
/// Current surfaces of the session
pub async fn get_session(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.current().await.view())
}

/// GET /session/stats
pub async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.current().await.stats().await)
}

/// POST /session/display
/// Acquire the display; restarts with a fresh session once the current one stopped
pub async fn acquire_display(State(state): State<AppState>) -> Response {
    let session = state.current_or_fresh().await;

    if session.view().unsupported {
        return failed(&SessionError::from(CaptureError::UnsupportedPlatform(
            "recording is not available".to_string(),
        )));
    }

    info!("Acquiring display for session {}", session.id());

    let result = session.acquire_display().await;
    respond(&session, "acquire display", result)
}

/// POST /session/record
pub async fn begin_recording(State(state): State<AppState>) -> Response {
    let session = state.current().await;
    info!("Beginning recording for session {}", session.id());

    let result = session.begin_recording().await;
    respond(&session, "begin recording", result)
}

/// POST /session/stop
pub async fn stop_recording(State(state): State<AppState>) -> Response {
    let session = state.current().await;
    info!("Stopping session {}", session.id());

    let result = session.request_stop().await;
    respond(&session, "stop", Ok(result))
}

/// GET /downloads/:filename
/// Artifact bytes of the current session
pub async fn download(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    let session = state.current().await;

    match session.artifact(&filename).await {
        Some(artifact) => {
            info!("Serving {} ({} bytes)", artifact.filename, artifact.size_bytes());
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, artifact.mime_type.clone()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", artifact.filename),
                    ),
                ],
                artifact.data,
            )
                .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                code: "NOT_FOUND".to_string(),
                error: format!("no artifact named {}", filename),
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
