//! Per-conversation tutoring state.

use crate::{
    context::{ContextWindow, QaPair},
    difficulty::{DifficultyLevel, InvalidDifficulty},
};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle the intent classifier uses to group utterances.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Establishes the conversation handle for a new session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// Called exactly once when a session starts.
    async fn create_session(&self) -> Result<ConversationId>;
}

/// Mints a fresh random id per session without any remote call.
///
/// Dialogflow accepts any caller-chosen session id, so this is the registry
/// used in production as well as in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalSessionRegistry;

#[async_trait]
impl SessionRegistry for LocalSessionRegistry {
    async fn create_session(&self) -> Result<ConversationId> {
        Ok(ConversationId::new(uuid::Uuid::new_v4().to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Active,
    Terminated,
}

/// One ongoing tutoring conversation.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    conversation_id: ConversationId,
    difficulty: DifficultyLevel,
    context: ContextWindow,
    state: SessionState,
}

impl Session {
    /// Starts a session, registering it with the external registry.
    pub async fn start(registry: &dyn SessionRegistry) -> Result<Self> {
        let conversation_id = registry.create_session().await?;
        tracing::debug!(%conversation_id, "Session registered");
        Ok(Self::with_conversation_id(conversation_id))
    }

    /// Builds an active session around an already-registered handle.
    pub fn with_conversation_id(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            difficulty: DifficultyLevel::default(),
            context: ContextWindow::new(),
            state: SessionState::Active,
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn difficulty(&self) -> DifficultyLevel {
        self.difficulty
    }

    pub fn set_difficulty(&mut self, level: DifficultyLevel) {
        self.difficulty = level;
    }

    /// Parses and applies a raw level; the session is untouched on error.
    pub fn set_difficulty_str(&mut self, value: &str) -> Result<(), InvalidDifficulty> {
        self.difficulty = value.parse()?;
        Ok(())
    }

    pub fn context(&self) -> &ContextWindow {
        &self.context
    }

    pub(crate) fn remember(&mut self, pair: QaPair) {
        self.context.append(pair);
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == SessionState::Terminated
    }

    /// Moves the session into its terminal state.
    pub fn terminate(&mut self) {
        self.state = SessionState::Terminated;
    }
}
