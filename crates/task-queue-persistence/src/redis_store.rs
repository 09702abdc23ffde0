//! Redis-backed [`Store`].

use crate::{PersistenceError, Result as PersistenceResult};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use std::time::Duration;
use task_queue_core::{Result, Store, TaskError};
use tracing::info;

/// Turn a `host:port` address into a connection URL. Addresses that already
/// carry a scheme are passed through.
pub fn redis_url(addr: &str) -> String {
    if addr.contains("://") {
        addr.to_string()
    } else {
        format!("redis://{}/", addr)
    }
}

/// Store over a shared, auto-reconnecting Redis connection
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis at `addr` and verify it answers `PING`
    pub async fn connect(addr: &str) -> PersistenceResult<Self> {
        let client = redis::Client::open(redis_url(addr))?;
        let connection = ConnectionManager::new(client).await?;
        let store = RedisStore { connection };

        store.ping_raw().await?;
        info!("Connected to Redis at {}", addr);

        Ok(store)
    }

    async fn ping_raw(&self) -> PersistenceResult<()> {
        let mut conn = self.connection.clone();
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        if reply != "PONG" {
            return Err(PersistenceError::UnexpectedPing(reply));
        }
        Ok(())
    }
}

fn store_error(e: redis::RedisError) -> TaskError {
    PersistenceError::from(e).into()
}

#[async_trait]
impl Store for RedisStore {
    async fn ping(&self) -> Result<()> {
        self.ping_raw().await.map_err(TaskError::from)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        conn.get(key).await.map_err(store_error)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: () = conn
            .set_ex(key, value, ttl.as_secs())
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: i64 = conn.lpush(key, value).await.map_err(store_error)?;
        Ok(())
    }

    async fn rpop(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        conn.rpop(key, None).await.map_err(store_error)
    }

    async fn llen(&self, key: &str) -> Result<u64> {
        let mut conn = self.connection.clone();
        conn.llen(key).await.map_err(store_error)
    }
}
