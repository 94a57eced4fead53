use pnet_types::{Key, ResolvedLocator};

use crate::error::StoreResult;
use crate::file::FileStore;
use crate::memory::MemoryStore;
use crate::traits::DataSource;

/// An opened store. One variant per backend kind, chosen once when the
/// locator is opened.
#[derive(Debug)]
pub enum Backend {
    Memory(MemoryStore),
    File(FileStore),
}

impl Backend {
    fn inner(&self) -> &dyn DataSource {
        match self {
            Self::Memory(store) => store,
            Self::File(store) => store,
        }
    }
}

impl From<MemoryStore> for Backend {
    fn from(store: MemoryStore) -> Self {
        Self::Memory(store)
    }
}

impl From<FileStore> for Backend {
    fn from(store: FileStore) -> Self {
        Self::File(store)
    }
}

impl DataSource for Backend {
    fn locator(&self) -> &ResolvedLocator {
        self.inner().locator()
    }

    fn get(&self, key: &Key) -> StoreResult<Option<String>> {
        self.inner().get(key)
    }

    fn set(&self, key: &Key, value: &str) -> StoreResult<()> {
        self.inner().set(key, value)
    }

    fn remove(&self, key: &Key) -> StoreResult<bool> {
        self.inner().remove(key)
    }

    fn enumerate_under(&self, prefix: &Key) -> StoreResult<Vec<(Key, String)>> {
        self.inner().enumerate_under(prefix)
    }

    fn flush(&self) -> StoreResult<()> {
        self.inner().flush()
    }

    fn close(&self) -> StoreResult<()> {
        self.inner().close()
    }
}
