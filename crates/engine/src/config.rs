//! Reconcile pass configuration.
//!
//! Every field has a default, so an empty document is a valid config.
//!
//! ```toml
//! late_initialize = true
//! prune = false
//! validate = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Switches for one reconcile pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcileConfig {
    /// Back-fill unset optional attributes from matched observed items.
    /// Identifier repair happens regardless.
    pub late_initialize: bool,
    /// Delete observed items that have no desired counterpart.
    pub prune: bool,
    /// Reject desired collections with duplicate identifiers or business
    /// keys before mutating anything.
    pub validate: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            late_initialize: true,
            prune: true,
            validate: true,
        }
    }
}

/// Errors loading a [`ReconcileConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `path` is `None` for inline configuration.
    #[error("could not parse {}: {source}", describe(.path.as_deref()))]
    Parse {
        path: Option<PathBuf>,
        #[source]
        source: toml::de::Error,
    },
}

fn describe(path: Option<&Path>) -> String {
    match path {
        Some(path) => format!("'{}'", path.display()),
        None => "inline config".to_string(),
    }
}

impl ReconcileConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, None)
    }

    /// Read and parse a TOML file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, Some(path.to_path_buf()))
    }

    fn parse(content: &str, path: Option<PathBuf>) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse { path, source })
    }
}
