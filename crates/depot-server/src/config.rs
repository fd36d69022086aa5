use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use depot_types::DEFAULT_PAGE_SIZE;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Top-level configuration, as read from a TOML file.
///
/// Every section and field is optional in the file; missing values take
/// their defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepotConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

impl DepotConfig {
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> ServerResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Upper bound on a request body in bytes, multipart uploads included.
    pub max_upload_size: usize,
    /// Page size for listings that do not ask for one.
    pub default_page_size: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            max_upload_size: 512 * 1024 * 1024,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local tables; everything is lost on exit.
    Memory,
    #[default]
    Filesystem,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Root of the filesystem backend. Unused by the memory backend.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            data_dir: PathBuf::from("./depot-data"),
        }
    }
}
