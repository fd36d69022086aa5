//! Filesystem-backed stores.
//!
//! Records are JSON files, content is plain blob files; see the layout
//! module for the directory structure. Uniqueness rests on the
//! no-clobber publish of the record file: of any number of concurrent
//! creates for one key, the filesystem lets exactly one link succeed.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use depot_types::{Package, Page, PageRequest, Version};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::checksum::copy_with_digest;
use crate::error::{Conflict, StoreError, StoreResult};
use crate::key::{PackageKey, VersionKey};
use crate::layout::{self, OWNER_DOMAIN, PACKAGE_DOMAIN, VERSION_DOMAIN};
use crate::traits::{PackageStore, StoredVersion, VersionStore};

const PACKAGES_DIR: &str = "packages";
const VERSIONS_DIR: &str = "versions";
const BLOBS_DIR: &str = "blobs";

/// Persisted form of a package. `seq` orders records by insertion.
#[derive(Serialize, Deserialize)]
struct PackageRecord {
    seq: Uuid,
    owner_id: String,
    package: Package,
}

impl PackageRecord {
    fn into_package(self) -> Package {
        self.package.owned_by(self.owner_id)
    }
}

/// Persisted form of a version, bound to the blob holding its content.
#[derive(Serialize, Deserialize)]
struct VersionRecord {
    seq: Uuid,
    owner_id: String,
    blob: Uuid,
    version: Version,
}

impl VersionRecord {
    fn into_version(self) -> Version {
        self.version.owned_by(self.owner_id)
    }
}

/// Filesystem [`PackageStore`] rooted at a data directory.
#[derive(Clone, Debug)]
pub struct FsPackageStore {
    root: PathBuf,
}

impl FsPackageStore {
    /// Open (or create) the package area under `data_dir`.
    pub fn open(data_dir: impl AsRef<Path>) -> StoreResult<Self> {
        let root = data_dir.as_ref().join(PACKAGES_DIR);
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn owner_dir(&self, owner_id: &str) -> PathBuf {
        self.root.join(layout::digest(OWNER_DOMAIN, &[owner_id]))
    }

    fn record_path(&self, owner_id: &str, reference: &str) -> PathBuf {
        layout::record_path(
            &self.owner_dir(owner_id),
            &layout::digest(PACKAGE_DOMAIN, &[owner_id, reference]),
        )
    }
}

impl PackageStore for FsPackageStore {
    fn create(&self, package: &Package) -> StoreResult<Package> {
        let record = PackageRecord {
            seq: Uuid::now_v7(),
            owner_id: package.owner_id.clone(),
            package: package.clone(),
        };
        let bytes = layout::encode(&record)?;
        let staged = layout::stage(&self.owner_dir(&package.owner_id), |f| f.write_all(&bytes))?;
        let target = self.record_path(&package.owner_id, &package.reference);

        match layout::publish(staged, &target) {
            Ok(()) => {
                debug!(
                    owner = %package.owner_id,
                    reference = %package.reference,
                    path = %target.display(),
                    "package record published"
                );
                Ok(package.clone())
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(Conflict::package(package, e.to_string()).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn find(&self, owner_id: &str, reference: &str) -> StoreResult<Option<Package>> {
        let path = self.record_path(owner_id, reference);
        let Some(record) = layout::read_record::<PackageRecord>(&path)? else {
            return Ok(None);
        };
        let package = record.into_package();
        if !PackageKey::new(owner_id, reference).matches(&package) {
            return Err(StoreError::Corrupt {
                path,
                reason: format!("record holds {}", PackageKey::of(&package)),
            });
        }
        Ok(Some(package))
    }

    fn list(&self, owner_id: &str, page: PageRequest) -> StoreResult<Page<Package>> {
        let mut records: Vec<PackageRecord> = layout::read_scope(&self.owner_dir(owner_id))?;
        records.retain(|r| r.owner_id == owner_id);
        records.sort_by_key(|r| r.seq);
        let scope = records.into_iter().map(PackageRecord::into_package).collect();
        Ok(Page::from_scope(scope, page))
    }
}

/// Filesystem [`VersionStore`] rooted at a data directory.
///
/// A create streams content into a staged blob file, publishes the blob
/// under a fresh id, then publishes the metadata record that points at it.
/// Only the record makes a version visible. If the record loses a
/// uniqueness race, the just-published blob is removed again; it was never
/// reachable through any key.
#[derive(Clone, Debug)]
pub struct FsVersionStore {
    records: PathBuf,
    blobs: PathBuf,
}

impl FsVersionStore {
    /// Open (or create) the version and blob areas under `data_dir`.
    pub fn open(data_dir: impl AsRef<Path>) -> StoreResult<Self> {
        let records = data_dir.as_ref().join(VERSIONS_DIR);
        let blobs = data_dir.as_ref().join(BLOBS_DIR);
        fs::create_dir_all(&records)?;
        fs::create_dir_all(&blobs)?;
        Ok(Self { records, blobs })
    }

    fn package_dir(&self, owner_id: &str, package_ref: &str) -> PathBuf {
        self.records
            .join(layout::digest(PACKAGE_DOMAIN, &[owner_id, package_ref]))
    }

    fn record_path(&self, key: &VersionKey) -> PathBuf {
        layout::record_path(
            &self.package_dir(&key.owner_id, &key.package_ref),
            &layout::digest(
                VERSION_DOMAIN,
                &[&key.owner_id, &key.package_ref, &key.version_id],
            ),
        )
    }

    fn blob_path(&self, blob: &Uuid) -> PathBuf {
        self.blobs.join(blob.simple().to_string())
    }

    /// The record stored under `key` with its blob id. A record holding a
    /// different key is corrupt.
    fn read_matching(&self, key: &VersionKey) -> StoreResult<Option<(Uuid, Version)>> {
        let path = self.record_path(key);
        let Some(record) = layout::read_record::<VersionRecord>(&path)? else {
            return Ok(None);
        };
        let blob = record.blob;
        let version = record.into_version();
        if !key.matches(&version) {
            return Err(StoreError::Corrupt {
                path,
                reason: format!("record holds {}", VersionKey::of(&version)),
            });
        }
        Ok(Some((blob, version)))
    }

    fn discard_blob(&self, blob: &Uuid) {
        let path = self.blob_path(blob);
        if let Err(e) = fs::remove_file(&path) {
            warn!(path = %path.display(), error = %e, "failed to remove unreferenced blob");
        }
    }
}

impl VersionStore for FsVersionStore {
    fn create(&self, version: &Version, content: &mut dyn Read) -> StoreResult<Version> {
        let mut digest = None;
        let staged_blob = layout::stage(&self.blobs, |f| {
            let mut sink = BufWriter::new(f);
            digest = Some(copy_with_digest(&mut *content, &mut sink)?);
            sink.flush()
        })?;
        let digest = digest.ok_or_else(|| {
            StoreError::Io(io::Error::other("content digest missing after staging"))
        })?;

        let blob = Uuid::now_v7();
        layout::publish(staged_blob, &self.blob_path(&blob))?;

        let stored = version
            .clone()
            .with_content_digest(digest.length, digest.checksum);
        let key = VersionKey::of(version);
        let record = VersionRecord {
            seq: Uuid::now_v7(),
            owner_id: stored.owner_id.clone(),
            blob,
            version: stored.clone(),
        };

        let published = layout::encode(&record).and_then(|bytes| {
            let staged = layout::stage(
                &self.package_dir(&key.owner_id, &key.package_ref),
                |f| f.write_all(&bytes),
            )?;
            match layout::publish(staged, &self.record_path(&key)) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    Err(Conflict::version(version, e.to_string()).into())
                }
                Err(e) => Err(StoreError::Io(e)),
            }
        });

        match published {
            Ok(()) => {
                debug!(
                    owner = %stored.owner_id,
                    package = %stored.package_ref,
                    version = %stored.version_id,
                    blob = %blob,
                    length = stored.length,
                    "version record published"
                );
                Ok(stored)
            }
            Err(e) => {
                self.discard_blob(&blob);
                Err(e)
            }
        }
    }

    fn find(
        &self,
        owner_id: &str,
        package_ref: &str,
        version_id: &str,
    ) -> StoreResult<Option<StoredVersion>> {
        let key = VersionKey::new(owner_id, package_ref, version_id);
        let Some((blob, version)) = self.read_matching(&key)? else {
            return Ok(None);
        };
        let blob = self.blob_path(&blob);
        let file = File::open(&blob).map_err(|e| StoreError::Corrupt {
            path: blob.clone(),
            reason: format!("blob for {key} unreadable: {e}"),
        })?;
        Ok(Some(StoredVersion {
            version,
            content: Box::new(BufReader::new(file)),
        }))
    }

    fn find_metadata(
        &self,
        owner_id: &str,
        package_ref: &str,
        version_id: &str,
    ) -> StoreResult<Option<Version>> {
        let key = VersionKey::new(owner_id, package_ref, version_id);
        Ok(self.read_matching(&key)?.map(|(_, version)| version))
    }

    fn list(
        &self,
        owner_id: &str,
        package_ref: &str,
        page: PageRequest,
    ) -> StoreResult<Page<Version>> {
        let mut records: Vec<VersionRecord> =
            layout::read_scope(&self.package_dir(owner_id, package_ref))?;
        records.retain(|r| r.owner_id == owner_id && r.version.package_ref == package_ref);
        records.sort_by_key(|r| r.seq);
        let scope = records.into_iter().map(VersionRecord::into_version).collect();
        Ok(Page::from_scope(scope, page))
    }
}
