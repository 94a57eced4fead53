use std::path::PathBuf;

/// Errors from backing-store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the underlying file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding or decoding a store file failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The file parsed, but does not hold a key/value tree.
    #[error("corrupt store file {path:?}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// The locator carries the `readonly` modifier.
    #[error("store is read-only: {locator}")]
    ReadOnly { locator: String },

    /// A file-store address that would leave the store root.
    #[error("invalid store address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// No backend is registered for this scheme.
    #[error("unsupported scheme {scheme:?}")]
    UnsupportedScheme { scheme: String },

    /// The key uses a segment the file layout reserves.
    #[error("key {key} uses reserved segment {segment:?}")]
    ReservedSegment { key: String, segment: String },

    /// The store has been closed.
    #[error("store is closed: {locator}")]
    Closed { locator: String },

    /// A lock guarding store state was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
