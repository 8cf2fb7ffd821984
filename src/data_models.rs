use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_SNIPPET_CHARS: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub href: String,
    pub body: String,
}

impl SearchResult {
    /// Builds a result, truncating `body` to [`MAX_SNIPPET_CHARS`] characters
    /// with a trailing `...` when it was cut.
    pub fn new(title: String, href: String, body: String) -> SearchResult {
        SearchResult {
            title,
            href,
            body: truncate_snippet(&body),
        }
    }
}

pub fn truncate_snippet(body: &str) -> String {
    match body.char_indices().nth(MAX_SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Turn {
        Turn {
            role,
            text: text.into(),
            at: Utc::now(),
        }
    }
}

/// Ordered, append-only conversation log owned by one session.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    turns: Vec<Turn>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a conversation from a previously recorded turn sequence.
    pub fn replay(turns: impl IntoIterator<Item = Turn>) -> Self {
        ConversationState {
            turns: turns.into_iter().collect(),
        }
    }

    /// Append one completed exchange: the submitted user turn followed by the model's reply.
    pub fn record_exchange(&mut self, user: impl Into<String>, reply: impl Into<String>) {
        self.turns.push(Turn::new(Role::User, user));
        self.turns.push(Turn::new(Role::Model, reply));
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
