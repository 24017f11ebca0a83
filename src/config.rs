//! Load configuration for a sharded edge-list directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::graph::StoredDirection;
use crate::parser::{LineGrammar, DEFAULT_SEPARATOR};

/// Where the shards are and how their lines are written.
///
/// Stored as JSON; fields other than `directory` may be omitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoadConfig {
    /// Directory containing the shard files.
    pub directory: PathBuf,
    /// Only files whose name starts with this prefix are shards.
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default)]
    pub quote: Option<char>,
    /// Parse workers; None = derive from host resources.
    #[serde(default)]
    pub threads: Option<usize>,
    #[serde(default)]
    pub direction: StoredDirection,
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

impl LoadConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            prefix: None,
            separator: default_separator(),
            quote: None,
            threads: None,
            direction: StoredDirection::Out,
        }
    }

    /// Read config from a JSON file.
    pub fn read_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write config as pretty JSON.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads == Some(0) {
            return Err(GraphError::InvalidConfig("threads must be > 0".into()));
        }
        LineGrammar::new(&self.separator, self.quote).map(|_| ())
    }
}
