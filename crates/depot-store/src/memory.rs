//! In-memory stores for tests and ephemeral use.
//!
//! Both stores keep rows in insertion order in a `Vec` and index them by
//! compound key in a `HashMap`, all behind one `RwLock`. The key check and
//! the insert happen under the same write guard, which is what makes
//! uniqueness atomic. Data is lost when the store is dropped.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;
use depot_types::{Package, Page, PageRequest, Version};
use tracing::debug;

use crate::checksum::copy_with_digest;
use crate::error::{Conflict, StoreError, StoreResult};
use crate::key::{PackageKey, VersionKey};
use crate::traits::{PackageStore, StoredVersion, VersionStore};

fn read_lock<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| StoreError::LockPoisoned)
}

fn write_lock<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| StoreError::LockPoisoned)
}

/// Cut one page out of the rows matching `scope`, counting all matches.
fn page_of<R, T>(
    rows: &[R],
    scope: impl Fn(&R) -> bool,
    project: impl Fn(&R) -> T,
    request: PageRequest,
) -> Page<T> {
    let total = rows.iter().filter(|r| scope(r)).count();
    let window = request.window(total);
    let items = rows
        .iter()
        .filter(|r| scope(r))
        .skip(window.start)
        .take(window.len())
        .map(project)
        .collect();
    Page::new(items, total as u64, request)
}

#[derive(Default)]
struct PackageTable {
    rows: Vec<Package>,
    index: HashMap<PackageKey, usize>,
}

/// In-memory [`PackageStore`].
#[derive(Default)]
pub struct InMemoryPackageStore {
    table: RwLock<PackageTable>,
}

impl InMemoryPackageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of packages across all owners.
    pub fn len(&self) -> usize {
        self.table.read().map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PackageStore for InMemoryPackageStore {
    fn create(&self, package: &Package) -> StoreResult<Package> {
        let key = PackageKey::of(package);
        let mut table = write_lock(&self.table)?;
        if table.index.contains_key(&key) {
            return Err(Conflict::package(package, "key already present in memory table").into());
        }
        let row = table.rows.len();
        table.rows.push(package.clone());
        table.index.insert(key, row);
        debug!(owner = %package.owner_id, reference = %package.reference, "package stored");
        Ok(package.clone())
    }

    fn find(&self, owner_id: &str, reference: &str) -> StoreResult<Option<Package>> {
        let table = read_lock(&self.table)?;
        let key = PackageKey::new(owner_id, reference);
        Ok(table.index.get(&key).map(|&row| table.rows[row].clone()))
    }

    fn list(&self, owner_id: &str, page: PageRequest) -> StoreResult<Page<Package>> {
        let table = read_lock(&self.table)?;
        Ok(page_of(
            &table.rows,
            |p| p.owner_id == owner_id,
            Package::clone,
            page,
        ))
    }
}

impl std::fmt::Debug for InMemoryPackageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryPackageStore")
            .field("package_count", &self.len())
            .finish()
    }
}

struct VersionRow {
    version: Version,
    content: Bytes,
}

#[derive(Default)]
struct VersionTable {
    rows: Vec<VersionRow>,
    index: HashMap<VersionKey, usize>,
}

/// In-memory [`VersionStore`].
///
/// Content is held as shared immutable bytes; every lookup hands out an
/// independent cursor over them.
#[derive(Default)]
pub struct InMemoryVersionStore {
    table: RwLock<VersionTable>,
}

impl InMemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of versions across all owners and packages.
    pub fn len(&self) -> usize {
        self.table.read().map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total content bytes held.
    pub fn total_bytes(&self) -> u64 {
        self.table
            .read()
            .map(|t| t.rows.iter().map(|r| r.content.len() as u64).sum())
            .unwrap_or(0)
    }
}

impl VersionStore for InMemoryVersionStore {
    fn create(&self, version: &Version, content: &mut dyn Read) -> StoreResult<Version> {
        // Stage the content outside the lock; it only becomes reachable
        // together with its metadata row below.
        let mut staged = Vec::new();
        let digest = copy_with_digest(content, &mut staged)?;
        let stored = version
            .clone()
            .with_content_digest(digest.length, digest.checksum);

        let key = VersionKey::of(version);
        let mut table = write_lock(&self.table)?;
        if table.index.contains_key(&key) {
            return Err(Conflict::version(version, "key already present in memory table").into());
        }
        let row = table.rows.len();
        table.rows.push(VersionRow {
            version: stored.clone(),
            content: Bytes::from(staged),
        });
        table.index.insert(key, row);
        debug!(
            owner = %stored.owner_id,
            package = %stored.package_ref,
            version = %stored.version_id,
            length = stored.length,
            "version stored"
        );
        Ok(stored)
    }

    fn find(
        &self,
        owner_id: &str,
        package_ref: &str,
        version_id: &str,
    ) -> StoreResult<Option<StoredVersion>> {
        let table = read_lock(&self.table)?;
        let key = VersionKey::new(owner_id, package_ref, version_id);
        Ok(table.index.get(&key).map(|&row| {
            let row = &table.rows[row];
            StoredVersion {
                version: row.version.clone(),
                content: Box::new(Cursor::new(row.content.clone())),
            }
        }))
    }

    fn find_metadata(
        &self,
        owner_id: &str,
        package_ref: &str,
        version_id: &str,
    ) -> StoreResult<Option<Version>> {
        let table = read_lock(&self.table)?;
        let key = VersionKey::new(owner_id, package_ref, version_id);
        Ok(table.index.get(&key).map(|&row| table.rows[row].version.clone()))
    }

    fn list(
        &self,
        owner_id: &str,
        package_ref: &str,
        page: PageRequest,
    ) -> StoreResult<Page<Version>> {
        let table = read_lock(&self.table)?;
        Ok(page_of(
            &table.rows,
            |r| r.version.owner_id == owner_id && r.version.package_ref == package_ref,
            |r| r.version.clone(),
            page,
        ))
    }
}

impl std::fmt::Debug for InMemoryVersionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVersionStore")
            .field("version_count", &self.len())
            .field("total_bytes", &self.total_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn package_store_conformance() {
        testing::run_package_store_conformance(&InMemoryPackageStore::new()).unwrap();
    }

    #[test]
    fn version_store_conformance() {
        testing::run_version_store_conformance(&InMemoryVersionStore::new()).unwrap();
    }

    #[test]
    fn concurrent_package_creates_have_one_winner() {
        testing::concurrent_package_creates(std::sync::Arc::new(InMemoryPackageStore::new()))
            .unwrap();
    }

    #[test]
    fn concurrent_version_creates_have_one_winner() {
        testing::concurrent_version_creates(std::sync::Arc::new(InMemoryVersionStore::new()))
            .unwrap();
    }

    #[test]
    fn counters_track_rows() {
        let packages = InMemoryPackageStore::new();
        assert!(packages.is_empty());
        packages.create(&Package::new("o", "r", "n")).unwrap();
        assert_eq!(packages.len(), 1);

        let versions = InMemoryVersionStore::new();
        versions
            .create(&Version::new("o", "r", "1", "n", "f"), &mut &b"abcd"[..])
            .unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions.total_bytes(), 4);
    }

    #[test]
    fn rejected_version_keeps_first_content() {
        let store = InMemoryVersionStore::new();
        let v = Version::new("o", "r", "1", "n", "f");
        store.create(&v, &mut &b"first"[..]).unwrap();
        assert!(store.create(&v, &mut &b"second!"[..]).unwrap_err().is_conflict());
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_bytes(), 5);
    }
}
