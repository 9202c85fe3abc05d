//! Configuration for approval-store

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("approval-store")
}

/// Configuration
///
/// Consumed at construction time only; the storage layer never re-reads
/// these values mid-operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for the record store
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// SQLite database file for handle bindings
    #[serde(default = "default_handle_db")]
    pub handle_db: PathBuf,

    /// Host minted handles resolve through
    #[serde(default = "default_handle_host")]
    pub handle_host: String,

    /// Naming-authority prefix for minted handles
    #[serde(default = "default_handle_prefix")]
    pub handle_prefix: String,
}

fn default_handle_db() -> PathBuf {
    default_data_dir().join("handles.db")
}

fn default_handle_host() -> String {
    "hdl.handle.net".to_string()
}

fn default_handle_prefix() -> String {
    "20.500.12345".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            handle_db: default_handle_db(),
            handle_host: default_handle_host(),
            handle_prefix: default_handle_prefix(),
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Path of the sled record store inside the data directory.
    pub fn records_path(&self) -> PathBuf {
        self.data_dir.join("records.sled")
    }
}
