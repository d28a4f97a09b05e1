//! DashMap-based in-memory ticket store.
//!
//! Entries carry their own expiry instant and are treated as absent once it
//! passes; expired entries are removed lazily on access. `DashMap::remove`
//! provides the atomic remove-and-return needed for one-shot ticket claims.
//!
//! Safety principle carried over from the concurrent-map idiom: never hold a
//! map reference across another map operation; extract values immediately.

use crate::errors::Result;
use crate::storage::core::TicketStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::time::Duration;

/// Value wrapper with expiration tracking.
#[derive(Debug, Clone)]
struct StoredEntry {
    data: Vec<u8>,
    expires_at: Option<DateTime<Utc>>,
}

impl StoredEntry {
    fn new(data: Vec<u8>, ttl: Option<Duration>) -> Self {
        let expires_at = ttl.and_then(|d| chrono::Duration::from_std(d).ok())
            .map(|d| Utc::now() + d);
        Self { data, expires_at }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.map(|exp| Utc::now() > exp).unwrap_or(false)
    }
}

/// In-memory ticket store for development and testing.
#[derive(Debug, Default)]
pub struct MemoryTicketStore {
    entries: DashMap<String, StoredEntry>,
}

impl MemoryTicketStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| !e.value().is_expired()).count()
    }

    /// Whether the store holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        self.entries
            .insert(key.to_string(), StoredEntry::new(value.to_vec(), ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let live = {
            // scope the shard lock before any mutation
            self.entries
                .get(key)
                .filter(|entry| !entry.is_expired())
                .map(|entry| entry.data.clone())
        };
        if live.is_none() {
            self.entries.remove_if(key, |_, entry| entry.is_expired());
        }
        Ok(live)
    }

    async fn take(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.entries.remove(key) {
            Some((_, entry)) if !entry.is_expired() => Ok(Some(entry.data)),
            _ => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<()> {
        self.entries.retain(|_, entry| !entry.is_expired());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_delete_roundtrip() {
        let store = MemoryTicketStore::new();
        store.set("k", b"v", None).await.expect("set");
        assert_eq!(store.get("k").await.expect("get"), Some(b"v".to_vec()));

        store.delete("k").await.expect("delete");
        assert_eq!(store.get("k").await.expect("get"), None);
    }

    #[tokio::test]
    async fn take_is_destructive() {
        let store = MemoryTicketStore::new();
        store.set("k", b"v", None).await.expect("set");

        assert_eq!(store.take("k").await.expect("take"), Some(b"v".to_vec()));
        assert_eq!(store.take("k").await.expect("second take"), None);
        assert_eq!(store.get("k").await.expect("get"), None);
    }

    #[tokio::test]
    async fn expired_entries_are_absent() {
        let store = MemoryTicketStore::new();
        store
            .set("k", b"v", Some(Duration::from_millis(10)))
            .await
            .expect("set");

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.get("k").await.expect("get"), None);
        assert_eq!(store.take("k").await.expect("take"), None);
    }

    #[tokio::test]
    async fn cleanup_drops_only_expired() {
        let store = MemoryTicketStore::new();
        store
            .set("short", b"a", Some(Duration::from_millis(10)))
            .await
            .expect("set short");
        store.set("long", b"b", None).await.expect("set long");

        tokio::time::sleep(Duration::from_millis(30)).await;
        store.cleanup_expired().await.expect("cleanup");

        assert!(store.entries.get("short").is_none());
        assert_eq!(store.get("long").await.expect("get"), Some(b"b".to_vec()));
    }

    #[tokio::test]
    async fn concurrent_takes_yield_one_winner() {
        use std::sync::Arc;

        let store = Arc::new(MemoryTicketStore::new());
        store.set("k", b"v", None).await.expect("set");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move { store.take("k").await.unwrap() }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.expect("join").is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
