//! Cache collaborator.
//!
//! Two shapes of data go through the cache:
//!
//! - Snapshots: a JSON string stored under a key with a TTL (hot rankings).
//! - Counter lists: values pushed onto a list and later drained by a job.
//!   Draining pops the entries, so a re-run never sees the same visit twice.
//!
//! [`RedisCache`] is the production backend. [`MemoryCache`] keeps everything
//! in process and is used by tests and single-node development setups.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use fred::clients::Client as RedisClient;
use fred::interfaces::{KeysInterface, ListInterface};
use fred::types::Expiration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{AppError, AppResult};

/// Shared handle to a cache backend.
pub type SharedCache = Arc<dyn CacheStore>;

/// Key/value and list operations the core needs from a cache.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Store `value` under `key`, expiring after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// Read the value stored under `key`.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Remove `key`.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Append `value` to the list stored under `key`. Lists never expire.
    async fn push(&self, key: &str, value: &str) -> AppResult<()>;

    /// Pop up to `max` entries from the head of the list under `key`.
    async fn drain(&self, key: &str, max: usize) -> AppResult<Vec<String>>;
}

/// Redis-backed cache.
#[derive(Clone)]
pub struct RedisCache {
    redis: Arc<RedisClient>,
    prefix: String,
}

impl RedisCache {
    /// Create a cache over a connected client. Every key is namespaced by `prefix`.
    #[must_use]
    pub fn new(redis: Arc<RedisClient>, prefix: impl Into<String>) -> Self {
        Self {
            redis,
            prefix: prefix.into(),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{key}", self.prefix)
    }
}

fn redis_err(e: fred::error::Error) -> AppError {
    AppError::Redis(e.to_string())
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.redis
            .set::<(), _, _>(
                self.key(key),
                value.to_string(),
                Some(Expiration::EX(ttl.as_secs() as i64)),
                None,
                false,
            )
            .await
            .map_err(redis_err)
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.redis
            .get::<Option<String>, _>(self.key(key))
            .await
            .map_err(redis_err)
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.redis
            .del::<(), _>(self.key(key))
            .await
            .map_err(redis_err)
    }

    async fn push(&self, key: &str, value: &str) -> AppResult<()> {
        self.redis
            .rpush::<i64, _, _>(self.key(key), value.to_string())
            .await
            .map_err(redis_err)?;
        Ok(())
    }

    async fn drain(&self, key: &str, max: usize) -> AppResult<Vec<String>> {
        let popped: Option<Vec<String>> = self
            .redis
            .lpop(self.key(key), Some(max))
            .await
            .map_err(redis_err)?;
        let popped = popped.unwrap_or_default();
        debug!(key = %key, count = popped.len(), "Drained counter list");
        Ok(popped)
    }
}

#[derive(Default)]
struct MemoryState {
    values: HashMap<String, (String, Instant)>,
    lists: HashMap<String, VecDeque<String>>,
}

/// In-process cache.
#[derive(Clone, Default)]
pub struct MemoryCache {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently queued under `key`.
    pub async fn list_len(&self, key: &str) -> usize {
        self.state.lock().await.lists.get(key).map_or(0, VecDeque::len)
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let expires_at = Instant::now() + ttl;
        self.state
            .lock()
            .await
            .values
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut state = self.state.lock().await;
        match state.values.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                state.values.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.values.remove(key);
        state.lists.remove(key);
        Ok(())
    }

    async fn push(&self, key: &str, value: &str) -> AppResult<()> {
        self.state
            .lock()
            .await
            .lists
            .entry(key.to_string())
            .or_default()
            .push_back(value.to_string());
        Ok(())
    }

    async fn drain(&self, key: &str, max: usize) -> AppResult<Vec<String>> {
        let mut state = self.state.lock().await;
        let Some(list) = state.lists.get_mut(key) else {
            return Ok(Vec::new());
        };
        let take = max.min(list.len());
        Ok(list.drain(..take).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_cache_ttl() {
        let cache = MemoryCache::new();
        cache
            .set_with_ttl("snapshot", "[1,2]", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("snapshot").await.unwrap().as_deref(), Some("[1,2]"));

        cache
            .set_with_ttl("stale", "x", Duration::from_secs(0))
            .await
            .unwrap();
        assert!(cache.get("stale").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_cache_drain_clears_entries() {
        let cache = MemoryCache::new();
        for id in ["a", "b", "a"] {
            cache.push("visits", id).await.unwrap();
        }

        let first = cache.drain("visits", 2).await.unwrap();
        assert_eq!(first, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(cache.list_len("visits").await, 1);

        let rest = cache.drain("visits", 10).await.unwrap();
        assert_eq!(rest, vec!["a".to_string()]);
        assert!(cache.drain("visits", 10).await.unwrap().is_empty());
    }
}
