//! Redis-backed queue store.

use redis::{Commands, ConnectionLike};

use super::QueueStore;
use crate::error::{DeployError, Result};

/// Queue store over one synchronous Redis connection.
pub struct RedisQueueStore<C = redis::Connection> {
    conn: C,
}

impl RedisQueueStore {
    /// Connect to a `redis://` or `rediss://` URI.
    pub fn open(uri: &str) -> Result<Self> {
        let client = redis::Client::open(uri).map_err(|e| DeployError::queue_store("open", e))?;
        let conn = client
            .get_connection()
            .map_err(|e| DeployError::queue_store("connect", e))?;
        tracing::debug!("connected to redis");
        Ok(Self::from_connection(conn))
    }
}

impl<C: ConnectionLike> RedisQueueStore<C> {
    pub fn from_connection(conn: C) -> Self {
        Self { conn }
    }
}

impl<C> std::fmt::Debug for RedisQueueStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisQueueStore").finish_non_exhaustive()
    }
}

impl<C: ConnectionLike> QueueStore for RedisQueueStore<C> {
    fn range_by_score(
        &mut self,
        set_key: &str,
        min: i64,
        max: i64,
        limit: usize,
    ) -> Result<Vec<String>> {
        let count = isize::try_from(limit).unwrap_or(isize::MAX);
        self.conn
            .zrangebyscore_limit(set_key, min, max, 0, count)
            .map_err(|e| DeployError::queue_store("ZRANGEBYSCORE", e))
    }

    fn remove(&mut self, set_key: &str, member: &str) -> Result<u64> {
        self.conn
            .zrem(set_key, member)
            .map_err(|e| DeployError::queue_store("ZREM", e))
    }

    fn field_exists(&mut self, key: &str, field: &str) -> Result<bool> {
        self.conn
            .hexists(key, field)
            .map_err(|e| DeployError::queue_store("HEXISTS", e))
    }

    fn get_field(&mut self, key: &str, field: &str) -> Result<Option<Vec<u8>>> {
        self.conn
            .hget(key, field)
            .map_err(|e| DeployError::queue_store("HGET", e))
    }
}
