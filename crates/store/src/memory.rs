// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process state store for development and tests.

use crate::store::{StateStore, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

#[derive(Default)]
struct Tables {
    hashes: HashMap<String, BTreeMap<String, String>>,
    // Head of the list is the front of the deque.
    lists: HashMap<String, VecDeque<String>>,
    counters: HashMap<String, i64>,
}

/// `StateStore` backed by process memory. Cheap to clone; clones share
/// the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        tables
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables
            .hashes
            .get(key)
            .and_then(|hash| hash.get(field))
            .cloned())
    }

    async fn hash_get_all(&self, key: &str) -> Result<Vec<(String, String)>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables
            .hashes
            .get(key)
            .map(|hash| {
                hash.iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn hash_delete(&self, key: &str, field: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        if let Some(hash) = tables.hashes.get_mut(key) {
            hash.remove(field);
        }
        Ok(())
    }

    async fn list_push_left(&self, key: &str, value: &str) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock();
        let list = tables.lists.entry(key.to_string()).or_default();
        list.push_front(value.to_string());
        Ok(list.len() as u64)
    }

    async fn list_push_right(&self, key: &str, value: &str) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock();
        let list = tables.lists.entry(key.to_string()).or_default();
        list.push_back(value.to_string());
        Ok(list.len() as u64)
    }

    async fn list_pop_right(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut tables = self.tables.lock();
        Ok(tables.lists.get_mut(key).and_then(VecDeque::pop_back))
    }

    async fn list_position(&self, key: &str, value: &str) -> Result<Option<u64>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables
            .lists
            .get(key)
            .and_then(|list| list.iter().position(|v| v == value))
            .map(|i| i as u64))
    }

    async fn list_length(&self, key: &str) -> Result<u64, StoreError> {
        let tables = self.tables.lock();
        Ok(tables.lists.get(key).map(VecDeque::len).unwrap_or(0) as u64)
    }

    async fn list_range(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables
            .lists
            .get(key)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_remove(&self, key: &str, count: u64, value: &str) -> Result<u64, StoreError> {
        let mut tables = self.tables.lock();
        let Some(list) = tables.lists.get_mut(key) else {
            return Ok(0);
        };
        let mut removed = 0;
        list.retain(|v| {
            if v == value && (count == 0 || removed < count) {
                removed += 1;
                false
            } else {
                true
            }
        });
        Ok(removed)
    }

    async fn counter_set(&self, key: &str, value: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        tables.counters.insert(key.to_string(), value);
        Ok(())
    }

    async fn counter_get(&self, key: &str) -> Result<Option<i64>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables.counters.get(key).copied())
    }

    async fn counter_incr(&self, key: &str, by: i64) -> Result<i64, StoreError> {
        let mut tables = self.tables.lock();
        let counter = tables.counters.entry(key.to_string()).or_insert(0);
        *counter += by;
        Ok(*counter)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
