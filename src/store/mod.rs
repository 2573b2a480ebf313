//! Shared key-value store abstraction
//!
//! CSRF state tokens, the team roster cache, and persisted access
//! tokens all live in one store with per-key expiry. The store is the
//! only cross-request shared mutable resource; its atomic
//! set-with-expiry / get / delete primitives are all the concurrency
//! control this crate needs.

mod memory;
mod redis;

pub use memory::InMemoryStore;
pub use redis::RedisStore;

use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Key-value store with per-key expiry.
///
/// Implementations must be safe for concurrent use from multiple
/// request handlers.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Atomically set a key with a TTL in seconds.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl_seconds: i64) -> Result<()>;

    /// Set a key with no expiry.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Get a key's value; `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Delete a key. Returns whether a live key was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Connectivity check.
    async fn ping(&self) -> Result<()>;
}

/// Parsed form of the `store.descriptor` configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreDescriptor {
    /// `tcp:{host}:{port},{db}` (db optional, defaults to 0)
    Tcp { host: String, port: u16, db: i64 },
    /// `unix:{path}` or `unix:{path},{db}`
    Unix { path: String, db: i64 },
    /// `memory:` — in-process store for tests and single-process hosts
    Memory,
}

impl StoreDescriptor {
    pub fn parse(descriptor: &str) -> Result<Self> {
        let malformed = || {
            AppError::Config(format!(
                "store.descriptor is malformed: {:?} (expected tcp:host:port[,db], unix:path[,db], or memory:)",
                descriptor
            ))
        };

        if let Some(rest) = descriptor.strip_prefix("tcp:") {
            let (addr, db) = split_db_suffix(rest).ok_or_else(malformed)?;
            let (host, port) = addr.rsplit_once(':').ok_or_else(malformed)?;
            if host.is_empty() {
                return Err(malformed());
            }
            let port: u16 = port.parse().map_err(|_| malformed())?;
            return Ok(Self::Tcp {
                host: host.to_string(),
                port,
                db,
            });
        }

        if let Some(rest) = descriptor.strip_prefix("unix:") {
            let (path, db) = split_db_suffix(rest).ok_or_else(malformed)?;
            if path.is_empty() {
                return Err(malformed());
            }
            return Ok(Self::Unix {
                path: path.to_string(),
                db,
            });
        }

        if descriptor == "memory:" {
            return Ok(Self::Memory);
        }

        Err(malformed())
    }

    /// Construct the store this descriptor names.
    pub async fn connect(&self) -> Result<Arc<dyn KeyValueStore>> {
        match self {
            Self::Memory => Ok(Arc::new(InMemoryStore::new())),
            Self::Tcp { .. } | Self::Unix { .. } => {
                Ok(Arc::new(RedisStore::connect(self).await?))
            }
        }
    }
}

fn split_db_suffix(rest: &str) -> Option<(&str, i64)> {
    match rest.rsplit_once(',') {
        Some((head, db)) => {
            let db: i64 = db.parse().ok()?;
            if db < 0 {
                return None;
            }
            Some((head, db))
        }
        None => Some((rest, 0)),
    }
}
