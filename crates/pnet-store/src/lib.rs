//! Backing stores for the persistence network.
//!
//! Each store owns the key/value pairs behind one resolved locator. The
//! network never interprets file formats; it talks to stores through the
//! [`DataSource`] trait and obtains them from a [`StoreProvider`].
//!
//! # Backends
//!
//! - [`MemoryStore`] -- `mem://` locators, process-local and non-persistent
//! - [`FileStore`] -- `yml://`, `json://` and `ini://` locators
//!
//! # Design Rules
//!
//! 1. Writes are serialized per store but parallel across stores.
//! 2. The store never routes: it sees full keys and stores them verbatim.
//! 3. All I/O errors are propagated, never silently ignored or retried.

pub mod backend;
pub mod error;
pub mod file;
pub mod format;
pub mod memory;
pub mod provider;
pub mod traits;

pub use backend::Backend;
pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use format::Format;
pub use memory::MemoryStore;
pub use provider::{FsProvider, Scheme};
pub use traits::{DataSource, StoreProvider};
