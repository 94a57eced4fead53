//! Lazily opened, cached backing stores, one per distinct locator.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use pnet_store::{Backend, DataSource, StoreError, StoreProvider, StoreResult};
use pnet_types::ResolvedLocator;
use tracing::{debug, info, warn};

/// A cache slot. The outer map lock only finds or inserts slots; the slot's
/// own lock is held while the store is constructed, so concurrent openers of
/// one locator wait for a single construction.
type Slot = Arc<Mutex<Option<Arc<Backend>>>>;

struct Slots {
    by_locator: HashMap<String, Slot>,
    closed: bool,
}

/// Opens each store at most once and keeps it until [`StoreRegistry::close_all`].
pub struct StoreRegistry {
    provider: Arc<dyn StoreProvider>,
    slots: Mutex<Slots>,
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> StoreError {
    StoreError::LockPoisoned(e.to_string())
}

impl StoreRegistry {
    pub fn new(provider: Arc<dyn StoreProvider>) -> Self {
        Self {
            provider,
            slots: Mutex::new(Slots {
                by_locator: HashMap::new(),
                closed: false,
            }),
        }
    }

    /// The store for `locator`, opening it on first use.
    ///
    /// If opening fails nothing is cached, and a later call tries again.
    pub fn open(&self, locator: &ResolvedLocator) -> StoreResult<Arc<Backend>> {
        let slot = {
            let mut slots = self.slots.lock().map_err(poisoned)?;
            if slots.closed {
                return Err(StoreError::Closed {
                    locator: locator.to_string(),
                });
            }
            slots
                .by_locator
                .entry(locator.as_str().to_string())
                .or_default()
                .clone()
        };

        let mut cell = slot.lock().map_err(poisoned)?;
        if let Some(store) = cell.as_ref() {
            return Ok(Arc::clone(store));
        }
        let store = Arc::new(self.provider.open(locator)?);
        info!(locator = %locator, "registered store");
        *cell = Some(Arc::clone(&store));
        Ok(store)
    }

    /// The already opened store for `locator`, without opening it.
    pub fn get(&self, locator: &ResolvedLocator) -> StoreResult<Option<Arc<Backend>>> {
        let slot = {
            let slots = self.slots.lock().map_err(poisoned)?;
            match slots.by_locator.get(locator.as_str()) {
                Some(slot) => Arc::clone(slot),
                None => return Ok(None),
            }
        };
        let cell = slot.lock().map_err(poisoned)?;
        Ok(cell.clone())
    }

    /// Every open store, in no particular order.
    pub fn open_stores(&self) -> StoreResult<Vec<Arc<Backend>>> {
        let slots: Vec<Slot> = {
            let slots = self.slots.lock().map_err(poisoned)?;
            slots.by_locator.values().cloned().collect()
        };
        let mut stores = Vec::with_capacity(slots.len());
        for slot in slots {
            if let Some(store) = slot.lock().map_err(poisoned)?.as_ref() {
                stores.push(Arc::clone(store));
            }
        }
        Ok(stores)
    }

    /// Number of open stores.
    pub fn len(&self) -> usize {
        self.open_stores().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.slots.lock().map(|s| s.closed).unwrap_or(true)
    }

    /// Flush every open store. All stores are attempted; the first failure
    /// is returned.
    pub fn flush_all(&self) -> StoreResult<()> {
        let mut first_err = None;
        for store in self.open_stores()? {
            if let Err(e) = store.flush() {
                warn!(locator = %store.locator(), error = %e, "flush failed");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Close every store and empty the cache. Later calls are no-ops, and
    /// [`StoreRegistry::open`] fails from then on.
    ///
    /// All stores are attempted; the first failure is returned.
    pub fn close_all(&self) -> StoreResult<()> {
        let drained: Vec<(String, Slot)> = {
            let mut slots = self.slots.lock().map_err(poisoned)?;
            if slots.closed {
                return Ok(());
            }
            slots.closed = true;
            slots.by_locator.drain().collect()
        };

        let mut first_err = None;
        let mut closed = 0usize;
        for (locator, slot) in drained {
            let store = match slot.lock() {
                Ok(mut cell) => cell.take(),
                Err(e) => {
                    first_err.get_or_insert(poisoned(e));
                    continue;
                }
            };
            let Some(store) = store else { continue };
            match store.close() {
                Ok(()) => closed += 1,
                Err(e) => {
                    warn!(locator = %locator, error = %e, "close failed");
                    first_err.get_or_insert(e);
                }
            }
        }
        debug!(closed, "closed all stores");
        first_err.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("open", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pnet_store::{FsProvider, MemoryStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    /// Opens memory stores and counts constructions.
    #[derive(Default)]
    struct CountingProvider {
        opened: AtomicUsize,
    }

    impl StoreProvider for CountingProvider {
        fn open(&self, locator: &ResolvedLocator) -> StoreResult<Backend> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            Ok(MemoryStore::new(locator.clone()).into())
        }
    }

    fn locator(text: &str) -> ResolvedLocator {
        ResolvedLocator::parse(text).unwrap()
    }

    #[test]
    fn open_caches_by_locator() {
        let provider = Arc::new(CountingProvider::default());
        let registry = StoreRegistry::new(provider.clone());

        let a1 = registry.open(&locator("mem://a")).unwrap();
        let a2 = registry.open(&locator("mem://a")).unwrap();
        let b = registry.open(&locator("mem://b")).unwrap();

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
        assert_eq!(provider.opened.load(Ordering::SeqCst), 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn modifiers_make_distinct_locators() {
        let provider = Arc::new(CountingProvider::default());
        let registry = StoreRegistry::new(provider.clone());
        registry.open(&locator("mem://a")).unwrap();
        registry.open(&locator("prettyprint:mem://a")).unwrap();
        assert_eq!(provider.opened.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_opens_construct_once() {
        let provider = Arc::new(CountingProvider::default());
        let registry = Arc::new(StoreRegistry::new(provider.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.open(&locator("mem://shared")).unwrap())
            })
            .collect();
        let stores: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(provider.opened.load(Ordering::SeqCst), 1);
        assert!(stores.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn failed_open_is_not_cached() {
        let registry = StoreRegistry::new(Arc::new(FsProvider::default()));
        assert!(registry.open(&locator("sql://db")).is_err());
        assert!(registry.get(&locator("sql://db")).unwrap().is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn close_all_runs_once_and_blocks_open() {
        let registry = StoreRegistry::new(Arc::new(CountingProvider::default()));
        let store = registry.open(&locator("mem://a")).unwrap();

        registry.close_all().unwrap();
        assert!(registry.is_closed());
        assert!(registry.is_empty());
        assert!(matches!(
            store.get(&pnet_types::Key::parse("k").unwrap()).unwrap_err(),
            StoreError::Closed { .. }
        ));
        assert!(matches!(
            registry.open(&locator("mem://a")).unwrap_err(),
            StoreError::Closed { .. }
        ));
        registry.close_all().unwrap();
    }

    #[test]
    fn flush_all_persists_deferred_writes() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = StoreRegistry::new(Arc::new(FsProvider::new(dir.path(), false)));
        let store = registry.open(&locator("ini://d.ini")).unwrap();
        store.set(&pnet_types::Key::parse("k").unwrap(), "v").unwrap();
        assert!(!dir.path().join("d.ini").exists());

        registry.flush_all().unwrap();
        assert!(dir.path().join("d.ini").exists());
    }
}
