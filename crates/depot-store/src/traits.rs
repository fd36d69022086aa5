use std::fmt;
use std::io::Read;

use depot_types::{Package, Page, PageRequest, Version};

use crate::error::StoreResult;

/// Caller-owned content stream of a stored version.
///
/// Dropping the reader closes it. Reading has no effect on stored data.
pub type ContentReader = Box<dyn Read + Send>;

/// A single version looked up by key: its metadata and its content.
pub struct StoredVersion {
    pub version: Version,
    pub content: ContentReader,
}

impl StoredVersion {
    /// Drain the content stream into memory. Intended for tests and small
    /// artifacts; transports should stream [`content`](Self::content) instead.
    pub fn read_to_vec(mut self) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(usize::try_from(self.version.length).unwrap_or(0));
        self.content.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl fmt::Debug for StoredVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredVersion")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Metadata store for packages.
///
/// All implementations must satisfy these invariants:
/// - `(owner_id, reference)` is unique, enforced atomically by `create`.
/// - `find` returns `Ok(None)` when absent; absence is not an error.
/// - `list` is scoped to one owner and ordered by insertion.
pub trait PackageStore: Send + Sync {
    /// Persist a new package.
    ///
    /// Returns [`StoreError::Conflict`](crate::StoreError::Conflict) carrying
    /// the attempted package when its key already exists.
    fn create(&self, package: &Package) -> StoreResult<Package>;

    /// Look up a package by owner and reference.
    fn find(&self, owner_id: &str, reference: &str) -> StoreResult<Option<Package>>;

    /// One page of the owner's packages plus the owner's total count.
    fn list(&self, owner_id: &str, page: PageRequest) -> StoreResult<Page<Package>>;
}

/// Blob store for versions: content plus metadata as one logical unit.
///
/// All implementations must satisfy these invariants:
/// - `(owner_id, package_ref, version_id)` is unique, enforced atomically on
///   the metadata record by `create`.
/// - Content streams in; length and checksum are computed while it does.
/// - Content and metadata become visible together. A rejected create leaves
///   no retrievable blob under the attempted key.
/// - `find` opens a content stream only when a record matches.
/// - `find_metadata` and `list` return metadata only and never touch content.
pub trait VersionStore: Send + Sync {
    /// Stream `content` into storage and persist `version` bound to it.
    ///
    /// The returned version carries the computed `length` and `checksum`;
    /// any values the caller put in those fields are ignored.
    fn create(&self, version: &Version, content: &mut dyn Read) -> StoreResult<Version>;

    /// Look up a version and open its content.
    fn find(
        &self,
        owner_id: &str,
        package_ref: &str,
        version_id: &str,
    ) -> StoreResult<Option<StoredVersion>>;

    /// Look up a version's metadata without opening its content.
    fn find_metadata(
        &self,
        owner_id: &str,
        package_ref: &str,
        version_id: &str,
    ) -> StoreResult<Option<Version>>;

    /// One page of a package's versions plus the package's total count.
    fn list(
        &self,
        owner_id: &str,
        package_ref: &str,
        page: PageRequest,
    ) -> StoreResult<Page<Version>>;
}
