//! File-backed stores for `yml://`, `json://` and `ini://` locators.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use pnet_types::{Key, Modifier, ResolvedLocator};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::format::{check_key, Format};
use crate::memory::under;
use crate::traits::DataSource;

/// Mutable state behind the store's mutex.
struct FileState {
    entries: BTreeMap<Key, String>,
    dirty: bool,
    closed: bool,
}

/// A key/value store persisted to one file.
///
/// The whole file is loaded on open and kept in memory. With
/// `write_through` every mutation rewrites the file; otherwise changes are
/// written on [`DataSource::flush`] or [`DataSource::close`]. Files are
/// replaced atomically through a temporary file in the same directory.
///
/// Locator modifiers:
/// - `prettyprint`: pretty encoding where the format has one
/// - `readonly`: mutations fail with [`StoreError::ReadOnly`]
/// - `transient`: the file is re-read before every access; implies write-through
pub struct FileStore {
    locator: ResolvedLocator,
    path: PathBuf,
    format: Format,
    pretty: bool,
    read_only: bool,
    transient: bool,
    write_through: bool,
    state: Mutex<FileState>,
}

impl FileStore {
    /// Open the store, loading `path` if it exists. A missing file is an
    /// empty store; the file is created on first write.
    pub fn open(
        locator: ResolvedLocator,
        path: PathBuf,
        format: Format,
        write_through: bool,
    ) -> StoreResult<Self> {
        let entries = load(&path, format)?;
        let transient = locator.has_modifier(Modifier::Transient);
        info!(locator = %locator, path = ?path, entries = entries.len(), "opened file store");
        Ok(Self {
            pretty: locator.has_modifier(Modifier::PrettyPrint),
            read_only: locator.has_modifier(Modifier::ReadOnly),
            transient,
            write_through: write_through || transient,
            locator,
            path,
            format,
            state: Mutex::new(FileState {
                entries,
                dirty: false,
                closed: false,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> Format {
        self.format
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, FileState>> {
        let state = self
            .state
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        if state.closed {
            return Err(StoreError::Closed {
                locator: self.locator.to_string(),
            });
        }
        Ok(state)
    }

    /// Lock for reading, refreshing from disk first for transient stores.
    fn lock_fresh(&self) -> StoreResult<MutexGuard<'_, FileState>> {
        let mut state = self.lock()?;
        if self.transient {
            state.entries = load(&self.path, self.format)?;
            state.dirty = false;
        }
        Ok(state)
    }

    fn lock_writable(&self) -> StoreResult<MutexGuard<'_, FileState>> {
        if self.read_only {
            return Err(StoreError::ReadOnly {
                locator: self.locator.to_string(),
            });
        }
        self.lock_fresh()
    }

    fn after_write(&self, state: &mut FileState) -> StoreResult<()> {
        state.dirty = true;
        if self.write_through {
            self.persist(state)?;
        }
        Ok(())
    }

    fn persist(&self, state: &mut FileState) -> StoreResult<()> {
        if !state.dirty {
            return Ok(());
        }
        let text = self.format.encode(&state.entries, self.pretty)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(text.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        state.dirty = false;
        debug!(path = ?self.path, entries = state.entries.len(), "persisted file store");
        Ok(())
    }
}

fn load(path: &Path, format: Format) -> StoreResult<BTreeMap<Key, String>> {
    match fs::read_to_string(path) {
        Ok(text) => format.decode(&text).map_err(|e| match e {
            StoreError::Serialization(reason) => StoreError::Corrupt {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(e.into()),
    }
}

impl DataSource for FileStore {
    fn locator(&self) -> &ResolvedLocator {
        &self.locator
    }

    fn get(&self, key: &Key) -> StoreResult<Option<String>> {
        let state = self.lock_fresh()?;
        Ok(state.entries.get(key).cloned())
    }

    fn set(&self, key: &Key, value: &str) -> StoreResult<()> {
        if !matches!(self.format, Format::Ini) {
            check_key(key)?;
        }
        let mut state = self.lock_writable()?;
        state.entries.insert(key.clone(), value.to_string());
        self.after_write(&mut state)
    }

    fn remove(&self, key: &Key) -> StoreResult<bool> {
        let mut state = self.lock_writable()?;
        if state.entries.remove(key).is_none() {
            return Ok(false);
        }
        self.after_write(&mut state)?;
        Ok(true)
    }

    fn enumerate_under(&self, prefix: &Key) -> StoreResult<Vec<(Key, String)>> {
        let state = self.lock_fresh()?;
        Ok(under(&state.entries, prefix))
    }

    fn flush(&self) -> StoreResult<()> {
        let mut state = self.lock()?;
        self.persist(&mut state)
    }

    fn close(&self) -> StoreResult<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        if state.closed {
            return Ok(());
        }
        self.persist(&mut state)?;
        state.closed = true;
        info!(locator = %self.locator, "closed file store");
        Ok(())
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("locator", &self.locator)
            .field("path", &self.path)
            .field("format", &self.format)
            .finish()
    }
}
