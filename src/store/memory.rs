//! In-process key-value store
//!
//! Backs tests, demos, and single-process deployments. Expiry is
//! checked lazily on read and delete; nothing sweeps dead keys, which
//! is fine for the short-lived processes this backend targets.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use super::KeyValueStore;
use crate::error::Result;

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        matches!(self.expires_at, Some(at) if at <= Utc::now())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        // A poisoned mutex means a panic mid-insert on a plain HashMap;
        // the map itself is still structurally sound.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait::async_trait]
impl KeyValueStore for InMemoryStore {
    async fn set_with_ttl(&self, key: &str, value: &str, ttl_seconds: i64) -> Result<()> {
        self.lock().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Utc::now() + Duration::seconds(ttl_seconds)),
            },
        );
        Ok(())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut entries = self.lock();
        match entries.remove(key) {
            Some(entry) => Ok(!entry.is_expired()),
            None => Ok(false),
        }
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_and_get_round_trip() {
        let store = InMemoryStore::new();
        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn expired_keys_read_as_absent() {
        let store = InMemoryStore::new();
        store.set_with_ttl("k", "v", -1).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_reports_whether_key_was_live() {
        let store = InMemoryStore::new();
        store.set("k", "v").await.unwrap();
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn delete_of_expired_key_is_a_miss() {
        let store = InMemoryStore::new();
        store.set_with_ttl("k", "v", -1).await.unwrap();
        assert!(!store.delete("k").await.unwrap());
    }
}
