//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    CreateSessionResponse, DraftRequest, ErrorResponse, FeedbackRequest, ListeningRequest,
    MessageRequest, SuccessResponse, TranscriptRequest,
};
use super::AppState;
use crate::runtime::{EngineError, HostedSession, SpeechError, WidgetSnapshot};
use crate::state_machine::TransitionError;
use crate::transcript::TurnId;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Lifecycle
        .route("/api/sessions", post(create_session))
        .route(
            "/api/sessions/:id",
            get(get_session).delete(dispose_session),
        )
        // SSE streaming
        .route("/api/sessions/:id/stream", get(stream_session))
        // Visibility
        .route("/api/sessions/:id/open", post(open_widget))
        .route("/api/sessions/:id/close", post(close_widget))
        .route("/api/sessions/:id/toggle", post(toggle_widget))
        .route("/api/sessions/:id/outside-click", post(outside_click))
        // Input
        .route("/api/sessions/:id/draft", put(update_draft))
        .route("/api/sessions/:id/messages", post(send_message))
        .route(
            "/api/sessions/:id/turns/:turn_id/feedback",
            post(submit_feedback),
        )
        // Speech capture
        .route("/api/sessions/:id/listening", post(set_listening))
        .route("/api/sessions/:id/transcript", post(push_transcript))
        .route("/api/sessions/:id/transcript/use", post(use_transcript))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

async fn find_session(state: &AppState, id: &str) -> Result<HostedSession, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {id}")))
}

// ============================================================
// Lifecycle
// ============================================================

async fn create_session(State(state): State<AppState>) -> Json<CreateSessionResponse> {
    let session = state.sessions.create().await;
    Json(CreateSessionResponse {
        session_id: session.handle.session_id().to_string(),
        session: session.handle.snapshot(),
    })
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WidgetSnapshot>, AppError> {
    let session = find_session(&state, &id).await?;
    Ok(Json(session.handle.snapshot()))
}

async fn dispose_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    if state.sessions.dispose(&id).await {
        Ok(Json(SuccessResponse { success: true }))
    } else {
        Err(AppError::NotFound(format!("Session not found: {id}")))
    }
}

async fn stream_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session = find_session(&state, &id).await?;

    // Subscribe before taking the snapshot so nothing falls in between
    let broadcast_rx = session.handle.subscribe();
    let snapshot = session.handle.snapshot();

    Ok(sse_stream(snapshot, broadcast_rx))
}

// ============================================================
// Visibility
// ============================================================

async fn open_widget(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WidgetSnapshot>, AppError> {
    let session = find_session(&state, &id).await?;
    session.handle.open().await?;
    Ok(Json(session.handle.snapshot()))
}

async fn close_widget(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WidgetSnapshot>, AppError> {
    let session = find_session(&state, &id).await?;
    session.handle.close().await?;
    Ok(Json(session.handle.snapshot()))
}

async fn toggle_widget(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WidgetSnapshot>, AppError> {
    let session = find_session(&state, &id).await?;
    session.handle.toggle().await?;
    Ok(Json(session.handle.snapshot()))
}

async fn outside_click(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WidgetSnapshot>, AppError> {
    let session = find_session(&state, &id).await?;
    session.handle.outside_click().await?;
    Ok(Json(session.handle.snapshot()))
}

// ============================================================
// Input
// ============================================================

async fn update_draft(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<DraftRequest>,
) -> Result<Json<WidgetSnapshot>, AppError> {
    let session = find_session(&state, &id).await?;
    session.handle.set_draft(req.text).await?;
    Ok(Json(session.handle.snapshot()))
}

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<WidgetSnapshot>, AppError> {
    let session = find_session(&state, &id).await?;
    match req.text {
        Some(text) => session.handle.send_message(text).await?,
        None => session.handle.submit().await?,
    }
    Ok(Json(session.handle.snapshot()))
}

async fn submit_feedback(
    State(state): State<AppState>,
    Path((id, turn_id)): Path<(String, String)>,
    Json(req): Json<FeedbackRequest>,
) -> Result<Json<WidgetSnapshot>, AppError> {
    let session = find_session(&state, &id).await?;
    let turn_id = TurnId::from(turn_id);

    if !session
        .handle
        .snapshot()
        .turns
        .iter()
        .any(|t| t.id == turn_id)
    {
        return Err(AppError::NotFound(format!("Turn not found: {turn_id}")));
    }

    session.handle.feedback(turn_id, req.vote).await?;
    Ok(Json(session.handle.snapshot()))
}

// ============================================================
// Speech capture
// ============================================================

async fn set_listening(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ListeningRequest>,
) -> Result<Json<WidgetSnapshot>, AppError> {
    let session = find_session(&state, &id).await?;
    if req.listening {
        session.handle.start_listening().await?;
    } else {
        session.handle.stop_listening().await?;
    }
    Ok(Json(session.handle.snapshot()))
}

async fn push_transcript(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TranscriptRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let session = find_session(&state, &id).await?;
    session.speech.push_transcript(req.text).await?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn use_transcript(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WidgetSnapshot>, AppError> {
    let session = find_session(&state, &id).await?;
    session.handle.use_transcript().await?;
    Ok(Json(session.handle.snapshot()))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("concierge ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl From<EngineError> for AppError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Closed | EngineError::Rejected(TransitionError::Disposed) => {
                AppError::NotFound("Session has been disposed".to_string())
            }
            EngineError::Rejected(
                e @ (TransitionError::WidgetHidden
                | TransitionError::ReplyPending
                | TransitionError::StaleReply(_)),
            ) => AppError::Conflict(e.to_string()),
        }
    }
}

impl From<SpeechError> for AppError {
    fn from(e: SpeechError) -> Self {
        match e {
            SpeechError::Unsupported => AppError::BadRequest(e.to_string()),
            SpeechError::NotListening => AppError::Conflict(e.to_string()),
            SpeechError::Failed(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
