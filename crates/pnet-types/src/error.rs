use thiserror::Error;

/// Errors produced when constructing foundation types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("invalid locator {locator:?}: {reason}")]
    InvalidLocator { locator: String, reason: String },
}
