//! Persistence network: one key space spread over many backing stores.
//!
//! A [`Network`] owns a compiled filter and a [`StoreRegistry`]. Each
//! operation routes its key through the filter to a locator, opens (or
//! reuses) the store behind that locator and delegates to it.
//!
//! # Quick Start
//!
//! ```rust
//! use pnet_network::Network;
//! use pnet_types::Key;
//!
//! let net = Network::new("**=mem://default\nusers.(*).**=mem://users/$1").unwrap();
//! let key = Key::parse("users.alice.email").unwrap();
//! net.set(&key, "alice@example.com").unwrap();
//! assert_eq!(net.get(&key).unwrap(), "alice@example.com");
//! assert_eq!(net.get_connection(&key).unwrap().as_str(), "mem://users/alice");
//! ```
//!
//! # Modules
//!
//! - [`network`] — The [`Network`] facade
//! - [`registry`] — Per-locator store cache
//! - [`config`] — [`NetworkConfig`], loaded from TOML
//! - [`error`] — [`NetworkError`]

pub mod config;
pub mod error;
pub mod network;
pub mod registry;

pub use config::NetworkConfig;
pub use error::{NetworkError, NetworkResult};
pub use network::Network;
pub use registry::StoreRegistry;
