// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The state-store interface: hash, list, and counter primitives.

use async_trait::async_trait;
use thiserror::Error;

/// Keys the pipeline service uses.
pub mod keys {
    /// Hash: ticket hex → JSON-encoded pipeline-run record.
    pub const PIPELINE_STATES: &str = "pipeline_states";
    /// List: ticket hex strings, pushed left, popped right (FIFO).
    pub const PIPELINE_QUEUE: &str = "pipeline_queue";
    /// List: JSON-encoded statistic points, appended right.
    pub const PIPELINE_STATISTICS: &str = "pipeline_statistics";
    /// Counter: consecutive failures of the maintenance worker loop.
    pub const WORKER_EXCEPTION_COUNT: &str = "METAKEGG_WORKER_EXCEPTION_COUNT";
}

/// Store failures. Callers surface these as 5xx; the worker treats them
/// as retryable tick errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Typed hash, list, and counter primitives on string keys. Every
/// operation is atomic on its single key; nothing here spans keys.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError>;
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError>;
    async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>, StoreError>;
    async fn hash_delete(&self, key: &str, field: &str) -> Result<(), StoreError>;

    /// Push to the head of the list; returns the new length.
    async fn list_push_left(&self, key: &str, value: &str) -> Result<u64, StoreError>;
    /// Append to the tail of the list; returns the new length.
    async fn list_push_right(&self, key: &str, value: &str) -> Result<u64, StoreError>;
    /// Pop from the tail of the list.
    async fn list_pop_right(&self, key: &str) -> Result<Option<String>, StoreError>;
    /// Index of the first occurrence of `value`, counted from the head.
    async fn list_position(&self, key: &str, value: &str) -> Result<Option<u64>, StoreError>;
    async fn list_length(&self, key: &str) -> Result<u64, StoreError>;
    /// All elements, head to tail.
    async fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError>;
    /// Remove up to `count` occurrences of `value` (0 removes all);
    /// returns how many were removed.
    async fn list_remove(&self, key: &str, count: u64, value: &str) -> Result<u64, StoreError>;

    async fn counter_set(&self, key: &str, value: i64) -> Result<(), StoreError>;
    async fn counter_get(&self, key: &str) -> Result<Option<i64>, StoreError>;
    /// Increment by `by`, creating the counter at zero first if missing;
    /// returns the new value.
    async fn counter_incr(&self, key: &str, by: i64) -> Result<i64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
