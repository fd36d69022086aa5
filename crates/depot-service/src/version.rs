use std::io::Read;
use std::sync::Arc;

use depot_store::{StoredVersion, VersionStore};
use depot_types::{Page, PageRequest, Version};
use tracing::{info, warn};

use crate::error::{NotFound, ServiceError, ServiceResult};
use crate::package::PackageService;

/// Version operations over a [`VersionStore`], checked against packages.
#[derive(Clone)]
pub struct VersionService {
    packages: PackageService,
    store: Arc<dyn VersionStore>,
}

impl VersionService {
    pub fn new(packages: PackageService, store: Arc<dyn VersionStore>) -> Self {
        Self { packages, store }
    }

    /// Publish a new version with its content.
    ///
    /// The owning package must exist; otherwise this fails with
    /// [`ServiceError::CreationFailed`] and the content is never read. The
    /// returned version carries the length and checksum computed from
    /// `content`.
    pub fn create_version<R: Read>(&self, version: Version, mut content: R) -> ServiceResult<Version> {
        match self.packages.get_package(&version.owner_id, &version.package_ref) {
            Ok(_) => {}
            Err(ServiceError::NotFound(source)) => {
                warn!(
                    owner = %version.owner_id,
                    package = %version.package_ref,
                    version = %version.version_id,
                    "version rejected: package does not exist"
                );
                return Err(ServiceError::CreationFailed {
                    version: Box::new(version),
                    source,
                });
            }
            Err(e) => return Err(e),
        }

        match self.store.create(&version, &mut content) {
            Ok(created) => {
                info!(
                    owner = %created.owner_id,
                    package = %created.package_ref,
                    version = %created.version_id,
                    length = created.length,
                    checksum = %created.checksum,
                    "version created"
                );
                Ok(created)
            }
            Err(e) => {
                let e = ServiceError::from(e);
                if e.is_conflict() {
                    warn!(
                        owner = %version.owner_id,
                        package = %version.package_ref,
                        version = %version.version_id,
                        "version already exists"
                    );
                }
                Err(e)
            }
        }
    }

    /// Look up a version and open its content.
    pub fn get_version(
        &self,
        owner_id: &str,
        package_ref: &str,
        version_id: &str,
    ) -> ServiceResult<StoredVersion> {
        self.store
            .find(owner_id, package_ref, version_id)?
            .ok_or_else(|| NotFound::version(owner_id, package_ref, version_id).into())
    }

    /// Look up a version's metadata only; its content is never opened.
    pub fn describe_version(
        &self,
        owner_id: &str,
        package_ref: &str,
        version_id: &str,
    ) -> ServiceResult<Version> {
        self.store
            .find_metadata(owner_id, package_ref, version_id)?
            .ok_or_else(|| NotFound::version(owner_id, package_ref, version_id).into())
    }

    pub fn list_versions(
        &self,
        owner_id: &str,
        package_ref: &str,
        page: PageRequest,
    ) -> ServiceResult<Page<Version>> {
        Ok(self.store.list(owner_id, package_ref, page)?)
    }

    pub fn packages(&self) -> &PackageService {
        &self.packages
    }
}

impl std::fmt::Debug for VersionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionService")
            .field("packages", &self.packages)
            .finish_non_exhaustive()
    }
}
