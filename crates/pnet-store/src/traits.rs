use std::fmt;

use pnet_types::{Key, ResolvedLocator};

use crate::backend::Backend;
use crate::error::StoreResult;

/// A key/value store bound to one locator.
///
/// Implementations must satisfy these invariants:
/// - Mutations are serialized per store: one writer at a time.
/// - Reads never observe a partially applied `set`.
/// - All I/O errors are propagated, never silently ignored or retried.
/// - After `close`, every operation fails with `StoreError::Closed`.
pub trait DataSource: Send + Sync + fmt::Debug {
    /// The locator this store was opened for.
    fn locator(&self) -> &ResolvedLocator;

    /// Read a value. Returns `Ok(None)` if the key is absent.
    fn get(&self, key: &Key) -> StoreResult<Option<String>>;

    /// Create or overwrite a value.
    fn set(&self, key: &Key, value: &str) -> StoreResult<()>;

    /// Remove a key. Returns `true` if it existed.
    fn remove(&self, key: &Key) -> StoreResult<bool>;

    /// Every stored pair whose key starts with `prefix`, in key order.
    fn enumerate_under(&self, prefix: &Key) -> StoreResult<Vec<(Key, String)>>;

    /// Persist pending changes.
    fn flush(&self) -> StoreResult<()>;

    /// Flush and release the store.
    fn close(&self) -> StoreResult<()>;

    /// Check whether a key is present.
    fn contains(&self, key: &Key) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// Opens backing stores by locator.
///
/// The network calls `open` at most once per distinct locator and caches
/// the result, so providers need not deduplicate.
pub trait StoreProvider: Send + Sync {
    fn open(&self, locator: &ResolvedLocator) -> StoreResult<Backend>;
}
