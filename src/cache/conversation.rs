//! Per-conversation message history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

/// Identifies a conversation (one per user session)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Generate a fresh random id
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ConversationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// One turn of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Batch lock entries kept before idle ones are pruned on the next `lock`
pub const LOCK_PRUNE_THRESHOLD: usize = 256;

/// Ordered, append-only message lists keyed by conversation id
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    histories: Arc<RwLock<HashMap<ConversationId, Vec<ConversationMessage>>>>,
    locks: Arc<Mutex<HashMap<ConversationId, Arc<Mutex<()>>>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, creating the history if needed
    pub async fn append(&self, id: &ConversationId, role: Role, content: impl Into<String>) {
        let mut histories = self.histories.write().await;
        histories
            .entry(id.clone())
            .or_default()
            .push(ConversationMessage::new(role, content));
    }

    /// Messages in insertion order; empty for unknown ids
    pub async fn get(&self, id: &ConversationId) -> Vec<ConversationMessage> {
        self.histories
            .read()
            .await
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Drop one history. Clearing an unknown id is a no-op.
    pub async fn clear(&self, id: &ConversationId) {
        if self.histories.write().await.remove(id).is_some() {
            debug!("🗑️ Cleared conversation history for {}", id);
        }

        let mut locks = self.locks.lock().await;
        if locks.get(id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(id);
        }
    }

    /// Drop every history, and the batch locks nobody is holding or waiting on
    pub async fn clear_all(&self) {
        self.histories.write().await.clear();
        self.locks
            .lock()
            .await
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub async fn conversation_count(&self) -> usize {
        self.histories.read().await.len()
    }

    /// Serialize work on one conversation. Hold the guard for the whole
    /// read-history / append sequence.
    ///
    /// Idle locks of other conversations are pruned whenever the map has
    /// grown past [`LOCK_PRUNE_THRESHOLD`] entries.
    pub async fn lock(&self, id: &ConversationId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            if locks.len() >= LOCK_PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            Arc::clone(locks.entry(id.clone()).or_default())
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn lock_count(&self) -> usize {
        self.locks.lock().await.len()
    }
}
