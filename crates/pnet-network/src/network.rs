//! The public facade: routes keys through the filter to their stores.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use pnet_filter::ParsedFilter;
use pnet_store::{Backend, DataSource, FsProvider, StoreProvider};
use pnet_types::{Key, ResolvedLocator};
use tracing::{debug, warn};

use crate::config::NetworkConfig;
use crate::error::{NetworkError, NetworkResult};
use crate::registry::StoreRegistry;

/// A compiled filter plus the stores it routes to.
///
/// Stores are opened on first use and stay open until [`Network::dispose`]
/// (or drop). A `Network` is `Sync`; callers on many threads may share it.
pub struct Network {
    filter: ParsedFilter,
    registry: StoreRegistry,
}

impl Network {
    /// Compile `filter_text` and route to stores under the current
    /// directory.
    pub fn new(filter_text: &str) -> NetworkResult<Self> {
        Self::with_config(filter_text, &NetworkConfig::default())
    }

    /// Compile `filter_text` and route to stores as `config` describes.
    pub fn with_config(filter_text: &str, config: &NetworkConfig) -> NetworkResult<Self> {
        let filter = pnet_filter::compile(filter_text)?;
        Ok(Self::from_filter(filter, config))
    }

    pub fn from_filter(filter: ParsedFilter, config: &NetworkConfig) -> Self {
        let provider = FsProvider::new(config.root.clone(), config.write_through);
        Self::with_provider(filter, Arc::new(provider))
    }

    /// Use a custom store provider.
    pub fn with_provider(filter: ParsedFilter, provider: Arc<dyn StoreProvider>) -> Self {
        debug!(rules = filter.rules().len(), aliases = filter.aliases().len(), "network created");
        Self {
            filter,
            registry: StoreRegistry::new(provider),
        }
    }

    pub fn filter(&self) -> &ParsedFilter {
        &self.filter
    }

    pub fn registry(&self) -> &StoreRegistry {
        &self.registry
    }

    /// The locator the most specific matching rule routes `key` to.
    pub fn get_connection(&self, key: &Key) -> NetworkResult<ResolvedLocator> {
        let best = self
            .filter
            .match_best(key)
            .ok_or_else(|| NetworkError::NoMatchingRule {
                key: key.to_string(),
            })?;
        let locator = self.filter.resolve(&best)?;
        debug!(key = %key, pattern = %best.rule.pattern(), locator = %locator, "routed");
        Ok(locator)
    }

    /// Every locator some matching rule routes `key` to.
    pub fn get_all_connections(&self, key: &Key) -> NetworkResult<BTreeSet<ResolvedLocator>> {
        self.filter
            .match_all(key)
            .iter()
            .map(|m| self.filter.resolve(m).map_err(NetworkError::from))
            .collect()
    }

    fn store_for(&self, key: &Key) -> NetworkResult<Arc<Backend>> {
        let locator = self.get_connection(key)?;
        Ok(self.registry.open(&locator)?)
    }

    pub fn set(&self, key: &Key, value: &str) -> NetworkResult<()> {
        self.store_for(key)?.set(key, value)?;
        Ok(())
    }

    /// Read a value. An absent key is [`NetworkError::KeyNotFound`].
    pub fn get(&self, key: &Key) -> NetworkResult<String> {
        let store = self.store_for(key)?;
        store.get(key)?.ok_or_else(|| NetworkError::KeyNotFound {
            key: key.to_string(),
            locator: store.locator().to_string(),
        })
    }

    pub fn has_key(&self, key: &Key) -> NetworkResult<bool> {
        Ok(self.store_for(key)?.contains(key)?)
    }

    /// Remove a key from its routed store. Returns `true` if it existed.
    pub fn clear_key(&self, key: &Key) -> NetworkResult<bool> {
        Ok(self.store_for(key)?.remove(key)?)
    }

    /// Every stored pair whose key starts with `prefix`, across all stores
    /// a key under `prefix` could be routed to.
    ///
    /// Each rule that could match an extension of `prefix` must have its
    /// locator fixed by `prefix` alone. If a rule's template needs a capture
    /// the prefix does not bind, the set of stores is open-ended and the
    /// query fails with [`NetworkError::UnresolvedCapture`].
    ///
    /// When several stores hold the same key, the value from the store the
    /// key routes to wins.
    pub fn get_namespace(&self, prefix: &Key) -> NetworkResult<BTreeMap<Key, String>> {
        let resolver = self.filter.resolver();
        let mut locators: Vec<ResolvedLocator> = Vec::new();

        for rule in self.filter.rules() {
            let Some(binding) = rule.pattern().match_prefix(prefix.segments()) else {
                continue;
            };
            let needed = resolver.referenced_captures(rule.template())?;
            if let Some(&index) = needed.iter().find(|&&i| !binding.is_bound(i)) {
                return Err(NetworkError::UnresolvedCapture {
                    prefix: prefix.to_string(),
                    pattern: rule.pattern().to_string(),
                    index,
                });
            }
            let locator = resolver.resolve(rule.template(), &binding.to_captures())?;
            if !locators.contains(&locator) {
                locators.push(locator);
            }
        }
        debug!(prefix = %prefix, stores = locators.len(), "namespace query");

        let mut found: BTreeMap<Key, (String, &ResolvedLocator)> = BTreeMap::new();
        for locator in &locators {
            let store = self.registry.open(locator)?;
            for (key, value) in store.enumerate_under(prefix)? {
                match found.entry(key) {
                    Entry::Vacant(slot) => {
                        slot.insert((value, locator));
                    }
                    Entry::Occupied(mut slot) => {
                        let routed = self.get_connection(slot.key()).ok();
                        debug!(key = %slot.key(), first = %slot.get().1, second = %locator, "key held by two stores");
                        if routed.as_ref() == Some(locator) {
                            slot.insert((value, locator));
                        }
                    }
                }
            }
        }
        Ok(found.into_iter().map(|(k, (v, _))| (k, v)).collect())
    }

    /// Persist pending changes in every open store.
    pub fn flush(&self) -> NetworkResult<()> {
        Ok(self.registry.flush_all()?)
    }

    /// Flush and close every open store.
    pub fn dispose(self) -> NetworkResult<()> {
        Ok(self.registry.close_all()?)
    }
}

impl Drop for Network {
    fn drop(&mut self) {
        if let Err(e) = self.registry.close_all() {
            warn!(error = %e, "closing stores on drop failed");
        }
    }
}

impl std::fmt::Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("rules", &self.filter.rules().len())
            .field("registry", &self.registry)
            .finish()
    }
}
