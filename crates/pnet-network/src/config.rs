use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, NetworkResult};

/// Configuration for a [`crate::Network`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Base directory for relative file-store addresses.
    pub root: PathBuf,
    /// Whether file stores rewrite their file on every mutation. When
    /// `false`, changes are persisted on flush and close.
    pub write_through: bool,
    /// Default filter file, used by the command line.
    pub filter: Option<PathBuf>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            write_through: true,
            filter: None,
        }
    }
}

impl NetworkConfig {
    /// A configuration rooted at `root` with default settings otherwise.
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Parse a TOML document. Missing fields take their defaults.
    pub fn from_toml_str(text: &str) -> NetworkResult<Self> {
        toml::from_str(text).map_err(|e| NetworkError::Config(e.to_string()))
    }

    /// Load a TOML file.
    ///
    /// Relative `root` and `filter` paths are taken relative to the
    /// directory holding the file.
    pub fn load(path: &Path) -> NetworkResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| NetworkError::Config(format!("{}: {e}", path.display())))?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(base) = path.parent() {
            if config.root.is_relative() {
                config.root = base.join(&config.root);
            }
            if let Some(filter) = config.filter.take() {
                config.filter = Some(if filter.is_relative() {
                    base.join(filter)
                } else {
                    filter
                });
            }
        }
        Ok(config)
    }
}
