//! HTTP Handlers

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use autosphere_core::{AgentError, ChatTurn};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    /// Absent and `null` both mean no history
    #[serde(default)]
    pub conversation_history: Option<Vec<ChatTurn>>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub response: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ai_initialized: bool,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub success: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn failure(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: error.into(),
        }),
    )
}

/// Status code for a failed agent call
pub fn error_status(err: &AgentError) -> StatusCode {
    match err {
        AgentError::Auth(_) | AgentError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
        AgentError::Network(_) | AgentError::ProviderUnavailable(_) | AgentError::NotInitialized => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        AgentError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn agent_failure(err: &AgentError) -> ApiError {
    let status = error_status(err);
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        failure(status, "Internal server error")
    } else {
        failure(status, err.user_message())
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Answer one chat message using the caller's history
pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(payload) = payload.map_err(|e| {
        tracing::debug!(error = %e, "Rejected chat body");
        failure(StatusCode::BAD_REQUEST, "Invalid request body")
    })?;

    let message = payload.message.trim();
    if message.is_empty() {
        return Err(failure(StatusCode::BAD_REQUEST, "Message is required"));
    }

    let Some(agent) = state.agent() else {
        return Err(failure(StatusCode::SERVICE_UNAVAILABLE, "AI service not initialized"));
    };

    let history = payload.conversation_history.as_deref().unwrap_or_default();
    let response = agent
        .respond(message, history, None)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Chat error");
            agent_failure(&e)
        })?;

    Ok(Json(ChatResponse {
        success: true,
        response,
        timestamp: Utc::now().to_rfc3339(),
    }))
}

/// Liveness and initialization state
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        ai_initialized: state.is_initialized(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Acknowledge a client-side history reset; nothing is stored server-side
pub async fn clear_conversation() -> Json<ClearResponse> {
    Json(ClearResponse {
        success: true,
        message: "Conversation cleared",
    })
}

/// JSON 404 for anything no route or static file matched
pub async fn not_found() -> ApiError {
    failure(StatusCode::NOT_FOUND, "Endpoint not found")
}
