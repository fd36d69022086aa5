use std::sync::Arc;

use depot_service::{PackageService, VersionService};
use depot_store::{
    FsPackageStore, FsVersionStore, InMemoryPackageStore, InMemoryVersionStore, PackageStore,
    VersionStore,
};
use tracing::info;

use crate::config::{DepotConfig, StorageBackend, StorageConfig};
use crate::error::ServerResult;

/// Shared application state passed to all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub packages: PackageService,
    pub versions: VersionService,
    /// Page size applied when a listing request does not give one.
    pub default_page_size: u64,
    /// Request body limit in bytes.
    pub max_upload_size: usize,
}

impl AppState {
    pub fn new(packages: Arc<dyn PackageStore>, versions: Arc<dyn VersionStore>) -> Self {
        let defaults = crate::config::ServerConfig::default();
        let packages = PackageService::new(packages);
        let versions = VersionService::new(packages.clone(), versions);
        Self {
            packages,
            versions,
            default_page_size: defaults.default_page_size,
            max_upload_size: defaults.max_upload_size,
        }
    }

    /// State backed by fresh in-memory stores.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryPackageStore::new()),
            Arc::new(InMemoryVersionStore::new()),
        )
    }

    /// Open the configured storage backend and apply server limits.
    pub fn from_config(config: &DepotConfig) -> ServerResult<Self> {
        let mut state = open_storage(&config.storage)?;
        state.default_page_size = config.server.default_page_size;
        state.max_upload_size = config.server.max_upload_size;
        Ok(state)
    }
}

fn open_storage(storage: &StorageConfig) -> ServerResult<AppState> {
    match storage.backend {
        StorageBackend::Memory => {
            info!("using in-memory storage; data will not survive a restart");
            Ok(AppState::in_memory())
        }
        StorageBackend::Filesystem => {
            info!(data_dir = %storage.data_dir.display(), "using filesystem storage");
            Ok(AppState::new(
                Arc::new(FsPackageStore::open(&storage.data_dir)?),
                Arc::new(FsVersionStore::open(&storage.data_dir)?),
            ))
        }
    }
}
