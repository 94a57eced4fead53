//! Foundation types for the persistence network.
//!
//! Every other `pnet` crate depends on `pnet-types`. The types here are plain
//! immutable values: they carry no routing logic and own no resources.
//!
//! # Key Types
//!
//! - [`Key`] — Ordered, non-empty sequence of dot-separated segments
//! - [`ResolvedLocator`] — Fully expanded `<modifiers:>scheme://address` string
//! - [`Modifier`] — Cosmetic or access flag prefixed to a locator

pub mod error;
pub mod key;
pub mod locator;

pub use error::TypeError;
pub use key::{Key, SEPARATOR};
pub use locator::{Modifier, ResolvedLocator};
