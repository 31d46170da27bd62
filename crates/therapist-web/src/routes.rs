//! HTTP surface of the browser chat.

use crate::page;
use crate::session::SessionStore;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use therapist_core::{Bubble, ChatMessage, TurnHandler};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<TurnHandler>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(handler: TurnHandler) -> Self {
        Self {
            handler: Arc::new(handler),
            sessions: Arc::new(SessionStore::new()),
        }
    }
}

#[derive(Serialize)]
struct SessionCreated {
    session_id: Uuid,
}

#[derive(Deserialize)]
struct SendMessage {
    content: String,
}

#[derive(Serialize)]
struct TurnReply {
    user: Bubble,
    assistant: Bubble,
}

enum ApiError {
    UnknownSession,
    EmptyInput,
    Provider { user: Bubble, message: String },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::UnknownSession => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": "unknown session" })),
            )
                .into_response(),
            ApiError::EmptyInput => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": "message is empty" })),
            )
                .into_response(),
            ApiError::Provider { user, message } => (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({ "user": user, "error": message })),
            )
                .into_response(),
        }
    }
}

/// Build the chat router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", delete(end_session))
        .route(
            "/api/sessions/:id/messages",
            get(list_messages).post(send_message),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Router used when startup configuration is incomplete: every path shows
/// the problem and nothing can reach the model.
pub fn config_error_router(message: &str) -> Router {
    let body = page::error_page(message);
    Router::new()
        .fallback(move || {
            let body = body.clone();
            async move { (StatusCode::SERVICE_UNAVAILABLE, Html(body)) }
        })
        .layer(TraceLayer::new_for_http())
}

async fn index() -> Html<String> {
    Html(page::chat_page())
}

async fn health() -> &'static str {
    "ok"
}

async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionCreated>) {
    let session_id = state.sessions.create();
    (StatusCode::CREATED, Json(SessionCreated { session_id }))
}

async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.sessions.remove(&id).ok_or(ApiError::UnknownSession)?;
    tracing::info!(session = %id, "session ended");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Bubble>>, ApiError> {
    let session = state.sessions.lock(&id).await.ok_or(ApiError::UnknownSession)?;
    Ok(Json(session.transcript.render()))
}

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SendMessage>,
) -> Result<Json<TurnReply>, ApiError> {
    if body.content.trim().is_empty() {
        return Err(ApiError::EmptyInput);
    }
    // Held until the reply lands: one turn at a time per session
    let mut session = state.sessions.lock(&id).await.ok_or(ApiError::UnknownSession)?;
    session.touch();

    let user = Bubble::from(&ChatMessage::user(body.content.as_str()));
    match state
        .handler
        .handle_input(&mut session.transcript, body.content)
        .await
    {
        Ok(reply) => Ok(Json(TurnReply {
            user,
            assistant: Bubble::from(&reply),
        })),
        Err(e) => Err(ApiError::Provider {
            user,
            message: e.to_string(),
        }),
    }
}
