use serde::{Deserialize, Serialize};

use super::defaults;

/// Local SQLite storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path. `None` means in-memory.
    pub db_path: Option<String>,
    /// Read connections for file-backed databases.
    pub read_pool_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            read_pool_size: defaults::DEFAULT_READ_POOL_SIZE,
        }
    }
}
