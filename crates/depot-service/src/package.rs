use std::sync::Arc;

use depot_store::PackageStore;
use depot_types::{Package, Page, PageRequest};
use tracing::{info, warn};

use crate::error::{NotFound, ServiceError, ServiceResult};

/// Package operations over a [`PackageStore`].
///
/// Holds no state beyond the store handle; clones share the store.
#[derive(Clone)]
pub struct PackageService {
    store: Arc<dyn PackageStore>,
}

impl PackageService {
    pub fn new(store: Arc<dyn PackageStore>) -> Self {
        Self { store }
    }

    /// Persist a new package. A duplicate `(owner_id, reference)` surfaces
    /// as [`ServiceError::Conflict`].
    pub fn create_package(&self, package: Package) -> ServiceResult<Package> {
        match self.store.create(&package) {
            Ok(created) => {
                info!(owner = %created.owner_id, reference = %created.reference, "package created");
                Ok(created)
            }
            Err(e) => {
                let e = ServiceError::from(e);
                if e.is_conflict() {
                    warn!(owner = %package.owner_id, reference = %package.reference, "package already exists");
                }
                Err(e)
            }
        }
    }

    pub fn get_package(&self, owner_id: &str, reference: &str) -> ServiceResult<Package> {
        self.store
            .find(owner_id, reference)?
            .ok_or_else(|| NotFound::package(owner_id, reference).into())
    }

    pub fn list_packages(&self, owner_id: &str, page: PageRequest) -> ServiceResult<Page<Package>> {
        Ok(self.store.list(owner_id, page)?)
    }
}

impl std::fmt::Debug for PackageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageService").finish_non_exhaustive()
    }
}
