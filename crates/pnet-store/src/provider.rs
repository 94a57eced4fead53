//! The default store provider: maps locator schemes onto backends.

use std::path::{Component, Path, PathBuf};

use pnet_types::ResolvedLocator;
use tracing::debug;

use crate::backend::Backend;
use crate::error::{StoreError, StoreResult};
use crate::file::FileStore;
use crate::format::Format;
use crate::memory::MemoryStore;
use crate::traits::StoreProvider;

/// Supported locator schemes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scheme {
    Yml,
    Json,
    Ini,
    Mem,
}

impl Scheme {
    /// Look up a scheme name, ignoring ASCII case. `yaml` is accepted as a
    /// spelling of `yml`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "yml" | "yaml" => Some(Self::Yml),
            "json" => Some(Self::Json),
            "ini" => Some(Self::Ini),
            "mem" => Some(Self::Mem),
            _ => None,
        }
    }

    /// The file encoding, or `None` for schemes that are not file-backed.
    pub fn format(&self) -> Option<Format> {
        match self {
            Self::Yml => Some(Format::Yaml),
            Self::Json => Some(Format::Json),
            Self::Ini => Some(Format::Ini),
            Self::Mem => None,
        }
    }
}

/// Opens stores from the local filesystem, resolving relative addresses
/// against `root`.
#[derive(Clone, Debug)]
pub struct FsProvider {
    root: PathBuf,
    write_through: bool,
}

impl FsProvider {
    pub fn new(root: impl Into<PathBuf>, write_through: bool) -> Self {
        Self {
            root: root.into(),
            write_through,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file a locator's address refers to.
    ///
    /// Addresses are relative paths below `root`. Absolute paths and `.` or
    /// `..` components are rejected, since captured key segments end up in
    /// addresses.
    pub fn path_for(&self, locator: &ResolvedLocator) -> StoreResult<PathBuf> {
        let address = locator.address();
        let invalid = |reason: &str| StoreError::InvalidAddress {
            address: address.to_string(),
            reason: reason.to_string(),
        };
        let relative = Path::new(address);
        for component in relative.components() {
            match component {
                Component::Normal(_) => {}
                Component::RootDir | Component::Prefix(_) => {
                    return Err(invalid("must be relative to the store root"))
                }
                Component::CurDir | Component::ParentDir => {
                    return Err(invalid("must not contain '.' or '..' components"))
                }
            }
        }
        Ok(self.root.join(relative))
    }
}

impl Default for FsProvider {
    fn default() -> Self {
        Self::new(".", true)
    }
}

impl StoreProvider for FsProvider {
    fn open(&self, locator: &ResolvedLocator) -> StoreResult<Backend> {
        let scheme =
            Scheme::from_name(locator.scheme()).ok_or_else(|| StoreError::UnsupportedScheme {
                scheme: locator.scheme().to_string(),
            })?;
        debug!(locator = %locator, ?scheme, "opening store");

        match scheme.format() {
            None => Ok(MemoryStore::new(locator.clone()).into()),
            Some(format) => {
                let path = self.path_for(locator)?;
                Ok(FileStore::open(locator.clone(), path, format, self.write_through)?.into())
            }
        }
    }
}
