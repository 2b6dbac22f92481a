//! HTTP request handlers

use super::types::{
    ChatRequest, ChatResponse, ClearResponse, ConversationStateResponse, CreateTwinRequest,
    ErrorResponse, FirstMessageResponse, MessagesResponse, TwinResponse,
};
use super::AppState;
use crate::db::DbError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Twin management
        .route("/api/twins", post(create_twin))
        .route("/api/twins/:id", get(get_twin))
        .route("/api/twins/:id/messages", get(get_messages))
        // Structured conversation
        .route("/api/twins/:id/conversation-state", get(get_conversation_state))
        .route("/api/twins/:id/first-message", post(first_message))
        .route("/api/twins/:id/clear", post(clear_chat))
        .route("/api/twins/:id/chat", post(send_chat))
        // Version
        .route("/version", get(get_version))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================
// Twin Management
// ============================================================

async fn create_twin(
    State(state): State<AppState>,
    Json(req): Json<CreateTwinRequest>,
) -> Result<Json<TwinResponse>, AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Twin name is required".to_string()));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let twin = state
        .db
        .create_twin(
            &id,
            name,
            &req.bio,
            &req.personality,
            req.music_summary.as_deref(),
            req.film_summary.as_deref(),
        )?;

    tracing::info!(twin_id = %twin.id, name = %twin.name, "Twin created");
    Ok(Json(TwinResponse { twin }))
}

async fn get_twin(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TwinResponse>, AppError> {
    let twin = state.db.get_twin(&id)?;
    Ok(Json(TwinResponse { twin }))
}

async fn get_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessagesResponse>, AppError> {
    state.db.get_twin(&id)?;
    let messages = state.db.get_messages(&id)?;
    Ok(Json(MessagesResponse { messages }))
}

// ============================================================
// Structured Conversation
// ============================================================

async fn get_conversation_state(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationStateResponse>, AppError> {
    state.db.get_twin(&id)?;
    let conversation = state
        .selector
        .flow()
        .get_conversation_state(&id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(ConversationStateResponse {
        state: conversation,
    }))
}

async fn first_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FirstMessageResponse>, AppError> {
    state.db.get_twin(&id)?;
    let message = state
        .selector
        .first_message(&id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(FirstMessageResponse { message }))
}

async fn clear_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ClearResponse>, AppError> {
    state.db.get_twin(&id)?;
    let conversation = state
        .selector
        .clear_chat(&id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(ClearResponse {
        success: true,
        state: conversation,
    }))
}

async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if req.text.trim().is_empty() {
        return Err(AppError::BadRequest("Message text is required".to_string()));
    }
    state.db.get_twin(&id)?;

    let turn = state
        .selector
        .handle_turn(&id, &req.text)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(twin_id = %id, source = ?turn.source, "Chat turn complete");
    Ok(Json(ChatResponse {
        reply: turn.reply_message,
        state: turn.state,
    }))
}

async fn get_version() -> &'static str {
    concat!("twin-chat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::TwinNotFound(_) | DbError::StateNotFound(_) => AppError::NotFound(e.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
