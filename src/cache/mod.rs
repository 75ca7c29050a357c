//! Answer caching and conversation history
//!
//! `ContextCache` bundles the TTL answer cache with the conversation store.
//! It is constructed once per process (or per test) and cloned into whoever
//! needs it; clones share state.

pub mod conversation;

pub use conversation::{ConversationId, ConversationMessage, ConversationStore, Role};

use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::config::CacheConfig;

/// What goes into a cache key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKeyScheme {
    /// `md5(question + ":" + context)`
    #[default]
    QuestionAndContext,
    /// `md5(question)`; hits across different transcripts
    QuestionOnly,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    answer: String,
    inserted_at: Instant,
}

/// Capacity-bounded answer cache with a fixed time-to-live
#[derive(Debug, Clone)]
pub struct ResponseCache {
    inner: Arc<Mutex<LruCache<String, CacheEntry>>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Mutex::new(LruCache::new(capacity))),
            ttl,
        }
    }

    /// Compute the cache key for a question under the given scheme
    pub fn key(question: &str, context: &str, scheme: CacheKeyScheme) -> String {
        let digest = match scheme {
            CacheKeyScheme::QuestionAndContext => md5::compute(format!("{}:{}", question, context)),
            CacheKeyScheme::QuestionOnly => md5::compute(question.as_bytes()),
        };
        format!("{:x}", digest)
    }

    /// Look up an answer. Returns None if absent or expired.
    pub async fn get(&self, key: &str) -> Option<String> {
        let mut cache = self.inner.lock().await;
        if let Some(entry) = cache.get(key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.answer.clone());
            }
            debug!("⏰ Cache entry expired: {}", key);
            cache.pop(key);
        }
        None
    }

    /// Insert or overwrite an answer, restarting its TTL
    pub async fn put(&self, key: String, answer: String) {
        let mut cache = self.inner.lock().await;

        if cache.len() == cache.cap().get() && !cache.contains(&key) {
            Self::purge_expired_locked(&mut cache, self.ttl);
        }

        if let Some((evicted, _)) = cache.push(
            key.clone(),
            CacheEntry {
                answer,
                inserted_at: Instant::now(),
            },
        ) {
            if evicted != key {
                debug!("Evicted least recently used answer: {}", evicted);
            }
        }
    }

    /// Remove every expired entry, returning how many were dropped
    pub async fn purge_expired(&self) -> usize {
        let mut cache = self.inner.lock().await;
        Self::purge_expired_locked(&mut cache, self.ttl)
    }

    fn purge_expired_locked(cache: &mut LruCache<String, CacheEntry>, ttl: Duration) -> usize {
        let expired: Vec<String> = cache
            .iter()
            .filter(|(_, entry)| entry.inserted_at.elapsed() >= ttl)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            cache.pop(key);
        }
        expired.len()
    }

    /// Number of stored entries, expired ones included until touched
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    pub async fn clear(&self) {
        self.inner.lock().await.clear();
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// Answer cache plus conversation histories
#[derive(Debug, Clone)]
pub struct ContextCache {
    responses: ResponseCache,
    conversations: ConversationStore,
    scheme: CacheKeyScheme,
}

impl ContextCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            responses: ResponseCache::new(config.max_entries, config.ttl()),
            conversations: ConversationStore::new(),
            scheme: config.key_scheme,
        }
    }

    pub fn key(&self, question: &str, context: &str) -> String {
        ResponseCache::key(question, context, self.scheme)
    }

    /// Cached answer for a question asked against `context`
    pub async fn get_response(&self, question: &str, context: &str) -> Option<String> {
        self.responses.get(&self.key(question, context)).await
    }

    pub async fn cache_response(&self, question: &str, context: &str, answer: impl Into<String>) {
        self.responses
            .put(self.key(question, context), answer.into())
            .await;
    }

    pub fn responses(&self) -> &ResponseCache {
        &self.responses
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    pub fn scheme(&self) -> CacheKeyScheme {
        self.scheme
    }

    /// Reset every cached answer and every conversation
    pub async fn clear_all(&self) {
        self.responses.clear().await;
        self.conversations.clear_all().await;
        debug!("🧹 Cleared all cached answers and conversation histories");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_config(ttl_seconds: u64, max_entries: usize) -> CacheConfig {
        CacheConfig {
            ttl_seconds,
            max_entries,
            ..CacheConfig::default()
        }
    }

    #[test]
    fn test_key_is_deterministic() {
        let a = ResponseCache::key("What?", "context", CacheKeyScheme::QuestionAndContext);
        let b = ResponseCache::key("What?", "context", CacheKeyScheme::QuestionAndContext);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_key_distinguishes_questions() {
        let a = ResponseCache::key("What?", "context", CacheKeyScheme::QuestionAndContext);
        let b = ResponseCache::key("Why?", "context", CacheKeyScheme::QuestionAndContext);
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_schemes() {
        let with_context_a = ResponseCache::key("q", "one", CacheKeyScheme::QuestionAndContext);
        let with_context_b = ResponseCache::key("q", "two", CacheKeyScheme::QuestionAndContext);
        assert_ne!(with_context_a, with_context_b);

        let only_a = ResponseCache::key("q", "one", CacheKeyScheme::QuestionOnly);
        let only_b = ResponseCache::key("q", "two", CacheKeyScheme::QuestionOnly);
        assert_eq!(only_a, only_b);
        // md5("q")
        assert_eq!(only_a, "7694f4a66316e53c8cdd9d9954bd611d");
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = ContextCache::new(&cache_config(60, 10));

        cache.cache_response("q", "ctx", "answer").await;
        assert_eq!(cache.get_response("q", "ctx").await.as_deref(), Some("answer"));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get_response("q", "ctx").await.is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get_response("q", "ctx").await.is_none());
        assert!(cache.responses().is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_resets_ttl() {
        let cache = ResponseCache::new(10, Duration::from_secs(60));

        cache.put("k".to_string(), "old".to_string()).await;
        tokio::time::advance(Duration::from_secs(50)).await;
        cache.put("k".to_string(), "new".to_string()).await;
        tokio::time::advance(Duration::from_secs(50)).await;

        assert_eq!(cache.get("k").await.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let cache = ResponseCache::new(2, Duration::from_secs(3600));

        cache.put("a".to_string(), "1".to_string()).await;
        cache.put("b".to_string(), "2".to_string()).await;
        assert!(cache.get("a").await.is_some());
        cache.put("c".to_string(), "3".to_string()).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get("a").await.is_some());
        assert!(cache.get("b").await.is_none());
        assert!(cache.get("c").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_cache_drops_expired_before_live_entries() {
        let cache = ResponseCache::new(2, Duration::from_secs(10));

        cache.put("stale".to_string(), "1".to_string()).await;
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.put("fresh".to_string(), "2".to_string()).await;
        // touch "stale" so plain LRU order would evict "fresh" next
        assert!(cache.get("stale").await.is_some());
        tokio::time::advance(Duration::from_secs(3)).await;

        cache.put("newest".to_string(), "3".to_string()).await;
        assert!(cache.get("fresh").await.is_some());
        assert!(cache.get("newest").await.is_some());
    }

    #[tokio::test]
    async fn test_clear_all_resets_answers_and_histories() {
        let cache = ContextCache::new(&CacheConfig::default());
        let id = ConversationId::from("s");

        cache.cache_response("q", "ctx", "a").await;
        cache.conversations().append(&id, Role::User, "q").await;
        cache.clear_all().await;

        assert!(cache.get_response("q", "ctx").await.is_none());
        assert!(cache.conversations().get(&id).await.is_empty());
    }
}
