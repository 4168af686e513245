//! Distributed route store
//!
//! The second resolution tier: a point GET against a shared key-value
//! store. Kept behind a trait so the directory can be exercised without a
//! live Redis.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::error::Result;

/// Point-lookup interface to the distributed route cache.
///
/// `Ok(None)` is a miss; transport failures surface as errors. Writes go
/// through the update channel, never through this interface.
#[async_trait]
pub trait RouteStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
}

/// Redis-backed route store.
///
/// Uses a managed connection that transparently re-establishes itself
/// after broker restarts.
pub struct RedisRouteStore {
    conn: ConnectionManager,
}

impl RedisRouteStore {
    /// Connect to Redis at the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("connected to route store at {}", url);
        Ok(Self { conn })
    }
}

#[async_trait]
impl RouteStore for RedisRouteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        // An empty string stored under the key is a miss, same as absence.
        Ok(value.filter(|addr| !addr.is_empty()))
    }
}
