//! Key-value store with expiry, used for login-attempt records

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Async key-value store
///
/// Entries may disappear at any time after their TTL; callers must treat
/// a missing entry as "never written".
#[async_trait]
pub trait KvStore<V>: Send + Sync {
    async fn get(&self, key: &str) -> Option<V>;
    async fn put(&self, key: &str, value: V);
    async fn delete(&self, key: &str);
}

/// In-process store; the TTL runs from the most recent `put`
pub struct MemoryStore<V> {
    entries: DashMap<String, (V, Instant)>,
    ttl: Duration,
}

impl<V> MemoryStore<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drop expired entries
    pub fn cleanup(&self) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, (_, stored_at)| stored_at.elapsed() < ttl);
    }
}

#[async_trait]
impl<V> KvStore<V> for MemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Option<V> {
        if let Some(entry) = self.entries.get(key) {
            let (value, stored_at) = entry.value();
            if stored_at.elapsed() < self.ttl {
                return Some(value.clone());
            }
        }
        let ttl = self.ttl;
        self.entries
            .remove_if(key, |_, (_, stored_at)| stored_at.elapsed() >= ttl);
        None
    }

    async fn put(&self, key: &str, value: V) {
        self.entries
            .insert(key.to_string(), (value, Instant::now()));
    }

    async fn delete(&self, key: &str) {
        self.entries.remove(key);
    }
}

impl<V> std::fmt::Debug for MemoryStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.entries.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_put_get_delete() {
        let store = MemoryStore::new(Duration::from_secs(60));
        store.put("a", 1u32).await;
        assert_eq!(store.get("a").await, Some(1));
        assert_eq!(store.get("b").await, None);

        store.delete("a").await;
        assert_eq!(store.get("a").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires() {
        let store = MemoryStore::new(Duration::from_secs(60));
        store.put("a", 1u32).await;

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(store.get("a").await, Some(1));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(store.get("a").await, None);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_restarts_ttl() {
        let store = MemoryStore::new(Duration::from_secs(60));
        store.put("a", 1u32).await;
        tokio::time::advance(Duration::from_secs(50)).await;
        store.put("a", 2u32).await;
        tokio::time::advance(Duration::from_secs(50)).await;
        assert_eq!(store.get("a").await, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_removes_only_expired() {
        let store = MemoryStore::new(Duration::from_secs(60));
        store.put("old", 1u32).await;
        tokio::time::advance(Duration::from_secs(45)).await;
        store.put("new", 2u32).await;
        tokio::time::advance(Duration::from_secs(30)).await;

        store.cleanup();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("new").await, Some(2));
    }
}
