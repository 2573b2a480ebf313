//! Redis-backed key-value store
//!
//! Uses `ConnectionManager` for automatic reconnection. Store errors
//! surface as `AppError::Store` (503), never as authorization failures.

use redis::aio::ConnectionManager;
use redis::Client;

use super::{KeyValueStore, StoreDescriptor};
use crate::error::Result;

#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Connect to the Redis instance named by a parsed descriptor.
    pub async fn connect(descriptor: &StoreDescriptor) -> Result<Self> {
        let url = match descriptor {
            StoreDescriptor::Tcp { host, port, db } => {
                format!("redis://{}:{}/{}", host, port, db)
            }
            StoreDescriptor::Unix { path, db } => {
                format!("redis+unix://{}?db={}", path, db)
            }
            StoreDescriptor::Memory => {
                unreachable!("memory descriptor does not name a Redis backend")
            }
        };

        tracing::info!(url = %url, "Connecting to key-value store");
        let client = Client::open(url)?;
        let manager = client.get_connection_manager().await?;
        tracing::info!("Key-value store connected");

        Ok(Self { manager })
    }
}

#[async_trait::async_trait]
impl KeyValueStore for RedisStore {
    async fn set_with_ttl(&self, key: &str, value: &str, ttl_seconds: i64) -> Result<()> {
        let mut conn = self.manager.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_seconds)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.manager.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.manager.clone();
        let deleted: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(deleted > 0)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        redis::cmd("PING").query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }
}
