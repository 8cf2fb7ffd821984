//! Generative model client.
//!
//! Talks to Google's Gemini `generateContent` endpoint. Conversation history
//! is owned by the caller and sent in full on every turn, so the client
//! itself is stateless and can be shared across sessions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::data_models::{Role, Turn};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model not configured: {0}")]
    NotConfigured(String),
    #[error("network error: {0}")]
    Network(reqwest::Error),
    #[error("model API error {status}: {message}")]
    Api {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error("model returned no text")]
    EmptyResponse,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Sends `message` as the next user turn after `history` and returns the reply text.
    async fn send(&self, history: &[Turn], message: &str) -> Result<String, ModelError>;
}

pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str) -> Result<GeminiClient, ModelError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ModelError::NotConfigured("GEMINI_API_KEY is not set".into()));
        }
        let client = reqwest::Client::builder().build().map_err(network)?;
        Ok(GeminiClient {
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: GEMINI_API_BASE.to_string(),
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<GeminiClient, ModelError> {
        let key = config
            .gemini_api_key
            .as_deref()
            .ok_or_else(|| ModelError::NotConfigured("GEMINI_API_KEY is not set".into()))?;
        Self::new(key, &config.gemini_model)
    }

    /// Point the client at a different API root, e.g. a local stand-in.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn api_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn send(&self, history: &[Turn], message: &str) -> Result<String, ModelError> {
        let request = build_request(history, message);

        tracing::debug!(
            model = %self.model,
            history_len = history.len(),
            message_len = message.len(),
            "sending request to Gemini"
        );

        let response = self
            .client
            .post(self.api_url())
            .json(&request)
            .send()
            .await
            .map_err(network)?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            return Err(ModelError::Api { status, message });
        }

        let body: GenerateContentResponse = response.json().await.map_err(network)?;
        extract_text(body)
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
}

// The request URL carries the API key; keep it out of error messages and logs.
fn network(e: reqwest::Error) -> ModelError {
    ModelError::Network(e.without_url())
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Model => "model",
    }
}

fn text_content(role: Role, text: &str) -> Content {
    Content {
        role: Some(role_name(role).to_string()),
        parts: vec![Part {
            text: Some(text.to_string()),
        }],
    }
}

fn build_request(history: &[Turn], message: &str) -> GenerateContentRequest {
    let mut contents: Vec<Content> = history
        .iter()
        .map(|turn| text_content(turn.role, &turn.text))
        .collect();
    contents.push(text_content(Role::User, message));
    GenerateContentRequest { contents }
}

fn extract_text(response: GenerateContentResponse) -> Result<String, ModelError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(ModelError::EmptyResponse);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::ConversationState;

    #[test]
    fn test_missing_key_is_not_configured() {
        assert!(matches!(
            GeminiClient::new("  ", "gemini-1.5-flash"),
            Err(ModelError::NotConfigured(_))
        ));
        assert!(matches!(
            GeminiClient::from_config(&Config::default()),
            Err(ModelError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_request_carries_history_in_order() {
        let mut state = ConversationState::new();
        state.record_exchange("Hello", "Hi there");

        let request = serde_json::to_value(build_request(state.turns(), "Plan my week")).unwrap();
        assert_eq!(
            request,
            serde_json::json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "Hello"}]},
                    {"role": "model", "parts": [{"text": "Hi there"}]},
                    {"role": "user", "parts": [{"text": "Plan my week"}]},
                ]
            })
        );
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let body: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hi "}, {"text": "there"}]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(extract_text(body).unwrap(), "Hi there");
    }

    #[test]
    fn test_extract_text_blocked_candidate() {
        let body: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();
        assert!(matches!(extract_text(body), Err(ModelError::EmptyResponse)));

        let body: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(matches!(extract_text(body), Err(ModelError::EmptyResponse)));
    }

    #[test]
    fn test_api_url() {
        let client = GeminiClient::new("k3y", "gemini-1.5-flash")
            .unwrap()
            .with_base_url("http://localhost:8080/");
        assert_eq!(
            client.api_url(),
            "http://localhost:8080/models/gemini-1.5-flash:generateContent?key=k3y"
        );
        assert_eq!(client.model(), "gemini-1.5-flash");
    }
}
