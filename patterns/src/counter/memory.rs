// Copyright (c) 2020-present, UMD Database Group.
//
// This program is free software: you can use, redistribute, and/or modify
// it under the terms of the GNU Affero General Public License, version 3
// or later ("AGPL"), as published by the Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.

//! A counter store in the function's memory.

use super::CounterStore;
use crate::error::{PatternError, Result};
use async_trait::async_trait;
use std::collections::hash_map::{Entry, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard};

/// Keeps counters as atomic integers.
///
/// The map itself is only write-locked to add a key. Increments take the
/// shared lock and update the integer with a compare-and-swap loop, so
/// concurrent increments of one key never wait on each other and never get
/// lost.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    counters: RwLock<HashMap<String, AtomicU64>>,
}

impl MemoryCounterStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, AtomicU64>>> {
        self.counters
            .read()
            .map_err(|_| PatternError::Internal("counter map lock poisoned".to_owned()))
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    fn name(&self) -> String {
        "MemoryCounterStore".to_string()
    }

    async fn create_if_absent(&self, key: &str, value: u64) -> Result<()> {
        let mut counters = self
            .counters
            .write()
            .map_err(|_| PatternError::Internal("counter map lock poisoned".to_owned()))?;
        match counters.entry(key.to_owned()) {
            Entry::Occupied(_) => Err(PatternError::AlreadyExists(format!("counter {}", key))),
            Entry::Vacant(slot) => {
                slot.insert(AtomicU64::new(value));
                Ok(())
            }
        }
    }

    async fn fetch_add(&self, key: &str, delta: u64) -> Result<u64> {
        let counters = self.read()?;
        let counter = counters
            .get(key)
            .ok_or_else(|| PatternError::NotFound(format!("counter {}", key)))?;
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_add(delta))
            .map_err(|v| PatternError::Internal(format!("counter {} overflows at {}", key, v)))
    }

    async fn load(&self, key: &str) -> Result<Option<u64>> {
        Ok(self
            .read()?
            .get(key)
            .map(|counter| counter.load(Ordering::SeqCst)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_twice() -> Result<()> {
        let store = MemoryCounterStore::new();
        store.create_if_absent("k", 5).await?;
        assert!(matches!(
            store.create_if_absent("k", 1).await,
            Err(PatternError::AlreadyExists(_))
        ));
        assert_eq!(store.load("k").await?, Some(5));
        Ok(())
    }

    #[tokio::test]
    async fn fetch_add_missing_key_creates_nothing() -> Result<()> {
        let store = MemoryCounterStore::new();
        assert!(matches!(
            store.fetch_add("k", 1).await,
            Err(PatternError::NotFound(_))
        ));
        assert_eq!(store.load("k").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn overflow_leaves_value_untouched() -> Result<()> {
        let store = MemoryCounterStore::new();
        store.create_if_absent("k", u64::MAX - 1).await?;
        assert_eq!(store.fetch_add("k", 1).await?, u64::MAX - 1);
        assert!(matches!(
            store.fetch_add("k", 1).await,
            Err(PatternError::Internal(_))
        ));
        assert_eq!(store.load("k").await?, Some(u64::MAX));
        Ok(())
    }
}
