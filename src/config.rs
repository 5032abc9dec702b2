//! Application manifest
//!
//! An archive may carry `/satchel.toml` next to its scripts to adjust how
//! it is bootstrapped. Every field is optional:
//!
//! ```toml
//! entry_point = "/main.lua"
//! source_extension = "lua"
//! chunk_size = 8192
//! ```

use crate::archive::VirtualArchive;
use crate::chunk::DEFAULT_CHUNK_SIZE;
use crate::error::{Result, SatchelError};
use serde::{Deserialize, Serialize};

/// Virtual path of the application manifest
pub const CONFIG_PATH: &str = "/satchel.toml";

/// Bootstrap settings read from the archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// First unit loaded and executed
    pub entry_point: String,

    /// Extension appended to module paths
    pub source_extension: String,

    /// Buffer capacity for chunked reads
    pub chunk_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            entry_point: "/init.lua".to_string(),
            source_extension: "lua".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Config {
    /// Parse a manifest from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read the manifest from the archive, falling back to defaults
    pub fn load(archive: &VirtualArchive) -> Result<Self> {
        if !archive.exists(CONFIG_PATH) {
            return Ok(Self::default());
        }

        let data = archive.read_file(CONFIG_PATH)?;
        let text = String::from_utf8(data)
            .map_err(|e| SatchelError::Config(format!("{} is not UTF-8: {}", CONFIG_PATH, e)))?;
        let config = Self::from_toml(&text)?;

        tracing::debug!(?config, "loaded application manifest");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(SatchelError::Config("chunk_size must be positive".to_string()));
        }
        if self.entry_point.is_empty() {
            return Err(SatchelError::Config("entry_point must not be empty".to_string()));
        }
        Ok(())
    }
}
