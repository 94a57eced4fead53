use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error(transparent)]
    Malformed(#[from] pnet_filter::MalformedFilterError),

    #[error("resolve error: {0}")]
    Resolve(#[from] pnet_filter::ResolveError),

    #[error("store error: {0}")]
    Store(#[from] pnet_store::StoreError),

    #[error("no filter rule matches key {key}")]
    NoMatchingRule { key: String },

    #[error("key {key} not found in {locator}")]
    KeyNotFound { key: String, locator: String },

    /// The store behind `pattern` depends on capture `$index`, which lies
    /// past the end of the queried prefix.
    #[error("namespace {prefix} is ambiguous: rule {pattern} needs capture ${index} beyond the prefix")]
    UnresolvedCapture {
        prefix: String,
        pattern: String,
        index: usize,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type NetworkResult<T> = Result<T, NetworkError>;
