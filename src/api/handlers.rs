use axum::{Json, extract::State, http::StatusCode};

use super::AppState;
use super::models::{ChatRequest, ChatResponse, MAX_MESSAGE_CHARS};

type Reply = (StatusCode, Json<ChatResponse>);

fn reject(status: StatusCode, error: &str) -> Reply {
    (status, Json(ChatResponse::error(error)))
}

/// `POST /api/chat`. Unparseable bodies are treated as an empty request.
pub async fn chat_handler(
    State(state): State<AppState>,
    request: Option<Json<ChatRequest>>,
) -> Reply {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let message = request.message.trim();

    if message.is_empty() {
        return reject(StatusCode::BAD_REQUEST, "No message provided");
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return reject(StatusCode::BAD_REQUEST, "Message too long");
    }
    let Some(assistant) = state.assistant.as_ref() else {
        return reject(StatusCode::INTERNAL_SERVER_ERROR, "LLM client not available");
    };

    match assistant
        .generate_response(request.session_key(), message)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(ChatResponse::success(response))),
        Err(e) => {
            tracing::error!("Error generating response: {:#}", e);
            reject(StatusCode::INTERNAL_SERVER_ERROR, "Error generating response")
        }
    }
}
