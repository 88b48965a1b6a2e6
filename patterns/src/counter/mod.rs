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

//! An atomic counter: one row per key, created once with an initial value and
//! incremented by exactly one per request.
//!
//! The service holds no lock of its own. Request handlers may run in separate
//! processes with no shared memory, so every increment is a single atomic
//! operation of the backing store:
//!
//! - `MemoryCounterStore`: holds the counters as atomic integers in the
//!   function's memory. Increments are lock-free compare-and-swap loops. This
//!   backend does not survive the process and is meant for tests and local
//!   runs.
//!
//! - `DynamoDbCounterStore`: holds one item per counter in an Amazon DynamoDB
//!   table. Increments are conditional `UpdateItem` calls with a `SET v = v + :num`
//!   update expression, which DynamoDB applies atomically.

mod dynamodb;
pub use dynamodb::{CounterTable, DynamoDbCounterStore};

mod memory;
pub use memory::MemoryCounterStore;

use crate::configs::PATTERNS_COUNTER_INITIAL_VALUE;
use crate::error::{PatternError, Result};
use async_trait::async_trait;
use log::{debug, info};
use serde::Serialize;
use std::fmt::Debug;

/// A persisted counter row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterRecord {
    /// The counter's identity, e.g. `system-aa`.
    pub key:   String,
    /// The current value.
    pub value: u64,
}

/// The store a counter service delegates to. Implementations must apply
/// [`CounterStore::fetch_add`] atomically with respect to concurrent calls on
/// the same key.
#[async_trait]
pub trait CounterStore: Debug + Send + Sync {
    /// The type of the store.
    fn name(&self) -> String;

    /// Creates `key` with `value`.
    ///
    /// Fails with [`PatternError::AlreadyExists`] and leaves the stored value
    /// untouched if the key exists.
    async fn create_if_absent(&self, key: &str, value: u64) -> Result<()>;

    /// Atomically adds `delta` to the value of `key` and returns the value
    /// prior to the addition.
    ///
    /// Fails with [`PatternError::NotFound`] and creates nothing if the key
    /// does not exist.
    async fn fetch_add(&self, key: &str, delta: u64) -> Result<u64>;

    /// Reads the current value of `key`.
    async fn load(&self, key: &str) -> Result<Option<u64>>;
}

/// The atomic counter service.
#[derive(Debug, Clone)]
pub struct CounterService<S: CounterStore> {
    store: S,
}

impl<S: CounterStore> CounterService<S> {
    /// Creates a service over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates the counter with the initial value unless it already exists.
    /// Initializing an existing counter is a successful no-op; its value is
    /// never overwritten.
    pub async fn initialize(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        match self
            .store
            .create_if_absent(key, *PATTERNS_COUNTER_INITIAL_VALUE)
            .await
        {
            Ok(()) => {
                info!(
                    "Counter {} initialized to {} in {}",
                    key,
                    *PATTERNS_COUNTER_INITIAL_VALUE,
                    self.store.name()
                );
                Ok(())
            }
            Err(PatternError::AlreadyExists(_)) => {
                debug!("Counter {} already exists in {}", key, self.store.name());
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Adds one to the counter and returns its value before the increment.
    ///
    /// Fails with [`PatternError::NotFound`] if the counter was never
    /// initialized. Store failures are returned without retrying.
    pub async fn increment(&self, key: &str) -> Result<u64> {
        validate_key(key)?;
        let prior = self.store.fetch_add(key, 1).await?;
        debug!("Counter {} incremented from {}", key, prior);
        Ok(prior)
    }

    /// Reads the counter.
    pub async fn get(&self, key: &str) -> Result<Option<CounterRecord>> {
        validate_key(key)?;
        Ok(self.store.load(key).await?.map(|value| CounterRecord {
            key: key.to_owned(),
            value,
        }))
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(PatternError::InvalidInput(
            "counter key must be a non-empty string".to_owned(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn service() -> CounterService<MemoryCounterStore> {
        CounterService::new(MemoryCounterStore::new())
    }

    #[tokio::test]
    async fn initialize_is_idempotent() -> Result<()> {
        let counter = service();
        counter.initialize("system-aa").await?;
        counter.initialize("system-aa").await?;
        assert_eq!(
            counter.get("system-aa").await?,
            Some(CounterRecord {
                key:   "system-aa".to_owned(),
                value: 1,
            })
        );
        Ok(())
    }

    #[tokio::test]
    async fn initialize_never_overwrites() -> Result<()> {
        let counter = service();
        counter.initialize("system-aa").await?;
        counter.increment("system-aa").await?;
        counter.increment("system-aa").await?;
        counter.initialize("system-aa").await?;
        assert_eq!(counter.get("system-aa").await?.map(|r| r.value), Some(3));
        Ok(())
    }

    #[tokio::test]
    async fn increment_returns_prior_value() -> Result<()> {
        let counter = service();
        counter.initialize("system-aa").await?;
        assert_eq!(counter.increment("system-aa").await?, 1);
        assert_eq!(counter.get("system-aa").await?.map(|r| r.value), Some(2));
        assert_eq!(counter.increment("system-aa").await?, 2);
        Ok(())
    }

    #[tokio::test]
    async fn increment_unknown_key() -> Result<()> {
        let counter = service();
        assert!(matches!(
            counter.increment("system-zz").await,
            Err(PatternError::NotFound(_))
        ));
        assert_eq!(counter.get("system-zz").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn empty_keys_are_invalid() {
        let counter = service();
        assert!(matches!(
            counter.initialize("").await,
            Err(PatternError::InvalidInput(_))
        ));
        assert!(matches!(
            counter.increment(" ").await,
            Err(PatternError::InvalidInput(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_increments_are_not_lost() -> Result<()> {
        let counter = Arc::new(service());
        counter.initialize("system-aa").await?;

        let n = 256;
        let tasks = (0..n)
            .map(|_| {
                let counter = counter.clone();
                tokio::spawn(async move { counter.increment("system-aa").await })
            })
            .collect::<Vec<_>>();

        let mut priors = Vec::with_capacity(n);
        for task in futures::future::join_all(tasks).await {
            priors.push(task.map_err(|e| PatternError::Internal(e.to_string()))??);
        }
        priors.sort_unstable();

        assert_eq!(priors, (1..=n as u64).collect::<Vec<_>>());
        assert_eq!(
            counter.get("system-aa").await?.map(|r| r.value),
            Some(n as u64 + 1)
        );
        Ok(())
    }
}
