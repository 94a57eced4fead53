//! In-memory store for `mem://` locators and tests.
//!
//! [`MemoryStore`] keeps all pairs in a `BTreeMap` behind a `RwLock`. Data
//! is lost when the store is dropped.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use pnet_types::{Key, Modifier, ResolvedLocator};

use crate::error::{StoreError, StoreResult};
use crate::traits::DataSource;

#[derive(Debug)]
pub struct MemoryStore {
    locator: ResolvedLocator,
    read_only: bool,
    closed: AtomicBool,
    entries: RwLock<BTreeMap<Key, String>>,
}

impl MemoryStore {
    /// Create an empty store. Honors the `readonly` modifier.
    pub fn new(locator: ResolvedLocator) -> Self {
        Self::with_entries(locator, BTreeMap::new())
    }

    /// Create a store pre-populated with `entries`.
    pub fn with_entries(locator: ResolvedLocator, entries: BTreeMap<Key, String>) -> Self {
        Self {
            read_only: locator.has_modifier(Modifier::ReadOnly),
            locator,
            closed: AtomicBool::new(false),
            entries: RwLock::new(entries),
        }
    }

    /// Number of stored pairs.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed {
                locator: self.locator.to_string(),
            });
        }
        Ok(())
    }

    fn check_writable(&self) -> StoreResult<()> {
        self.check_open()?;
        if self.read_only {
            return Err(StoreError::ReadOnly {
                locator: self.locator.to_string(),
            });
        }
        Ok(())
    }
}

impl DataSource for MemoryStore {
    fn locator(&self) -> &ResolvedLocator {
        &self.locator
    }

    fn get(&self, key: &Key) -> StoreResult<Option<String>> {
        self.check_open()?;
        let entries = self
            .entries
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &Key, value: &str) -> StoreResult<()> {
        self.check_writable()?;
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        entries.insert(key.clone(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &Key) -> StoreResult<bool> {
        self.check_writable()?;
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        Ok(entries.remove(key).is_some())
    }

    fn enumerate_under(&self, prefix: &Key) -> StoreResult<Vec<(Key, String)>> {
        self.check_open()?;
        let entries = self
            .entries
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        Ok(under(&entries, prefix))
    }

    fn flush(&self) -> StoreResult<()> {
        self.check_open()
    }

    fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

/// Pairs whose key starts with `prefix`. Keys sharing a prefix form one
/// contiguous range in segment-wise order, starting at the prefix itself.
pub(crate) fn under(entries: &BTreeMap<Key, String>, prefix: &Key) -> Vec<(Key, String)> {
    entries
        .range(prefix.clone()..)
        .take_while(|(k, _)| k.starts_with(prefix))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
