//! Ledger configuration, loadable from JSON.

use std::num::NonZeroUsize;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Depth used when a config omits `max_depth`.
pub const DEFAULT_MAX_DEPTH: usize = 100;

fn default_max_depth() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_MAX_DEPTH).unwrap_or(NonZeroUsize::MIN)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Maximum number of undoable entries. Zero is rejected while parsing.
    #[serde(default = "default_max_depth")]
    pub max_depth: NonZeroUsize,
    /// Optional name attached to the ledger's log lines.
    #[serde(default)]
    pub label: Option<String>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig { max_depth: default_max_depth(), label: None }
    }
}

impl LedgerConfig {
    pub fn with_max_depth(max_depth: usize) -> Result<Self, ConfigError> {
        let max_depth = NonZeroUsize::new(max_depth)
            .ok_or_else(|| ConfigError::Invalid("max_depth must be at least 1".into()))?;
        Ok(LedgerConfig { max_depth, label: None })
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}
