use serde::{Deserialize, Serialize};

pub const MAX_MESSAGE_CHARS: usize = 1000;

/// Session key used when a request does not name one.
pub const DEFAULT_SESSION: &str = "default";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ChatRequest {
    pub fn session_key(&self) -> &str {
        self.session_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SESSION)
    }
}

/// Exactly one of `response` / `error` is ever present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ChatResponse {
    Success { response: String },
    Error { error: String },
}

impl ChatResponse {
    pub fn success(response: impl Into<String>) -> Self {
        ChatResponse::Success {
            response: response.into(),
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        ChatResponse::Error {
            error: error.into(),
        }
    }
}
