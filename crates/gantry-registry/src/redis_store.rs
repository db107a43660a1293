//! Redis-backed implementation of the [`Store`] capability.
//!
//! Sets map to SADD/SREM/SMEMBERS, the history list to LPUSH/LRANGE
//! (newest first), and change notifications to PUBLISH. Every command
//! error surfaces as `StoreUnavailable`.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::store::Store;

fn store_err(e: redis::RedisError) -> RegistryError {
    RegistryError::StoreUnavailable(e.to_string())
}

/// Store backed by a Redis server.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis at `url` (e.g. `redis://127.0.0.1:6379`).
    ///
    /// The connection manager reconnects on command failure, so a single
    /// `RedisStore` can be cloned and shared for the process lifetime.
    pub async fn connect(url: &str) -> RegistryResult<Self> {
        let client = redis::Client::open(url).map_err(store_err)?;
        let conn = client.get_connection_manager().await.map_err(store_err)?;
        debug!(%url, "connected to redis store");
        Ok(Self { conn })
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn members(&self, key: &str) -> RegistryResult<Vec<String>> {
        let mut conn = self.conn.clone();
        conn.smembers(key).await.map_err(store_err)
    }

    async fn add_member(&self, key: &str, member: &str) -> RegistryResult<bool> {
        let mut conn = self.conn.clone();
        let added: i64 = conn.sadd(key, member).await.map_err(store_err)?;
        Ok(added > 0)
    }

    async fn remove_member(&self, key: &str, member: &str) -> RegistryResult<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.srem(key, member).await.map_err(store_err)?;
        Ok(removed > 0)
    }

    async fn push_record(&self, key: &str, value: &str) -> RegistryResult<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.lpush(key, value).await.map_err(store_err)?;
        Ok(())
    }

    async fn recent_records(&self, key: &str, limit: usize) -> RegistryResult<Vec<String>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        conn.lrange(key, 0, limit as isize - 1)
            .await
            .map_err(store_err)
    }

    async fn publish(&self, channel: &str, message: &str) -> RegistryResult<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.publish(channel, message).await.map_err(store_err)?;
        Ok(())
    }
}
