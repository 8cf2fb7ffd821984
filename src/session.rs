use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::composer::{Composer, NOT_CONFIGURED_REPLY};
use crate::config::{Config, DEFAULT_MAX_SESSIONS};
use crate::data_models::ConversationState;
use crate::llm::{ChatModel, GeminiClient, ModelError};
use crate::search::{DuckDuckGoSearch, WebSearch};

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("assistant failed: {0}")]
    Internal(#[from] anyhow::Error),
}

/// What the HTTP layer talks to.
///
/// Implementations may fail; the handler turns any `Err` into a generic
/// 500 without exposing its detail.
#[async_trait]
pub trait Assistant: Send + Sync {
    async fn generate_response(&self, session_id: &str, message: &str)
    -> Result<String, ChatError>;
}

struct Session {
    state: Arc<Mutex<ConversationState>>,
    last_used: AtomicU64,
}

/// Conversations keyed by session id, created on first use.
///
/// Holds at most `max_sessions` entries; creating one past that evicts the
/// least recently used. An evicted conversation still finishes any turn that
/// already holds its state.
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    max_sessions: usize,
    clock: AtomicU64,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_max_sessions(DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_sessions(max_sessions: usize) -> Self {
        SessionStore {
            sessions: DashMap::new(),
            max_sessions: max_sessions.max(1),
            clock: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    pub fn get_or_create(&self, session_id: &str) -> Arc<Mutex<ConversationState>> {
        if let Some(session) = self.sessions.get(session_id) {
            session.last_used.store(self.tick(), Ordering::Relaxed);
            return session.state.clone();
        }

        let state = {
            let session = self
                .sessions
                .entry(session_id.to_string())
                .or_insert_with(|| Session {
                    state: Arc::default(),
                    last_used: AtomicU64::new(0),
                });
            session.last_used.store(self.tick(), Ordering::Relaxed);
            session.state.clone()
        };
        // the shard guard above must be released before scanning for eviction

        while self.sessions.len() > self.max_sessions {
            if !self.evict_oldest(session_id) {
                break;
            }
        }
        state
    }

    fn evict_oldest(&self, keep: &str) -> bool {
        let oldest = self
            .sessions
            .iter()
            .filter(|entry| entry.key() != keep)
            .min_by_key(|entry| entry.value().last_used.load(Ordering::Relaxed))
            .map(|entry| entry.key().clone());
        match oldest {
            Some(key) => {
                log::debug!("evicting idle session {key}");
                self.sessions.remove(&key);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

pub struct ChatService {
    composer: Composer,
    sessions: SessionStore,
}

impl ChatService {
    pub fn new(composer: Composer) -> ChatService {
        Self::with_sessions(composer, SessionStore::new())
    }

    pub fn with_sessions(composer: Composer, sessions: SessionStore) -> ChatService {
        ChatService { composer, sessions }
    }

    /// Wires the Gemini model and DuckDuckGo search from configuration.
    ///
    /// A missing API key is not an error: the service starts unconfigured
    /// and answers every message with a fixed notice.
    pub fn from_config(config: &Config) -> anyhow::Result<ChatService> {
        let model: Option<Arc<dyn ChatModel>> = match GeminiClient::from_config(config) {
            Ok(client) => {
                tracing::info!(model = client.model(), "Gemini client configured");
                Some(Arc::new(client) as Arc<dyn ChatModel>)
            }
            Err(ModelError::NotConfigured(reason)) => {
                tracing::error!("{reason}");
                None
            }
            Err(e) => return Err(anyhow::anyhow!("error configuring Gemini client: {e}")),
        };
        let search: Arc<dyn WebSearch> = Arc::new(DuckDuckGoSearch::new()?);
        Ok(ChatService::with_sessions(
            Composer::new(model, search),
            SessionStore::with_max_sessions(config.max_sessions),
        ))
    }

    pub fn is_configured(&self) -> bool {
        self.composer.is_configured()
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}

#[async_trait]
impl Assistant for ChatService {
    async fn generate_response(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<String, ChatError> {
        if !self.composer.is_configured() {
            return Ok(NOT_CONFIGURED_REPLY.to_string());
        }
        let session = self.sessions.get_or_create(session_id);
        // one turn at a time per conversation
        let mut state = session.lock().await;
        Ok(self.composer.generate_response(&mut state, message).await)
    }
}
