// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis-backed state store for production deployments.

use crate::store::{StateStore, StoreError};
use async_trait::async_trait;
use bb8::Pool;
use bb8_redis::RedisConnectionManager;
// Leading `::` to name the redis crate rather than this module.
use ::redis::cmd;
use tracing::debug;

/// `StateStore` over a Redis-compatible server, using a bb8 connection
/// pool. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool<RedisConnectionManager>,
}

impl RedisStore {
    /// Connect to the server at `url` (e.g. `redis://localhost:6379/0`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        debug!("Creating Redis connection pool for {}", url);
        let manager =
            RedisConnectionManager::new(url).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let pool = Pool::builder()
            .build(manager)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self { pool })
    }

    async fn query<T: ::redis::FromRedisValue>(
        &self,
        command: ::redis::Cmd,
    ) -> Result<T, StoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        command
            .query_async(&mut *conn)
            .await
            .map_err(|e: ::redis::RedisError| StoreError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl StateStore for RedisStore {
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut c = cmd("HSET");
        c.arg(key).arg(field).arg(value);
        self.query::<()>(c).await
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let mut c = cmd("HGET");
        c.arg(key).arg(field);
        self.query(c).await
    }

    async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>, StoreError> {
        let mut c = cmd("HGETALL");
        c.arg(key);
        let entries: std::collections::HashMap<String, String> = self.query(c).await?;
        Ok(entries.into_iter().collect())
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<(), StoreError> {
        let mut c = cmd("HDEL");
        c.arg(key).arg(field);
        self.query::<()>(c).await
    }

    async fn list_push_left(&self, key: &str, value: &str) -> Result<u64, StoreError> {
        let mut c = cmd("LPUSH");
        c.arg(key).arg(value);
        self.query(c).await
    }

    async fn list_push_right(&self, key: &str, value: &str) -> Result<u64, StoreError> {
        let mut c = cmd("RPUSH");
        c.arg(key).arg(value);
        self.query(c).await
    }

    async fn list_pop_right(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut c = cmd("RPOP");
        c.arg(key);
        self.query(c).await
    }

    async fn list_position(&self, key: &str, value: &str) -> Result<Option<u64>, StoreError> {
        let mut c = cmd("LPOS");
        c.arg(key).arg(value);
        self.query(c).await
    }

    async fn list_length(&self, key: &str) -> Result<u64, StoreError> {
        let mut c = cmd("LLEN");
        c.arg(key);
        self.query(c).await
    }

    async fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut c = cmd("LRANGE");
        c.arg(key).arg(0).arg(-1);
        self.query(c).await
    }

    async fn list_remove(&self, key: &str, count: u64, value: &str) -> Result<u64, StoreError> {
        let mut c = cmd("LREM");
        c.arg(key).arg(count).arg(value);
        self.query(c).await
    }

    async fn counter_set(&self, key: &str, value: i64) -> Result<(), StoreError> {
        let mut c = cmd("SET");
        c.arg(key).arg(value);
        self.query::<()>(c).await
    }

    async fn counter_get(&self, key: &str) -> Result<Option<i64>, StoreError> {
        let mut c = cmd("GET");
        c.arg(key);
        self.query(c).await
    }

    async fn counter_incr(&self, key: &str, by: i64) -> Result<i64, StoreError> {
        let mut c = cmd("INCRBY");
        c.arg(key).arg(by);
        self.query(c).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.query::<()>(cmd("PING")).await
    }
}
