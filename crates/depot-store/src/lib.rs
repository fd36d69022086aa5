//! Storage backends for Depot packages and versions.
//!
//! Two stores, one per entity kind:
//!
//! - [`PackageStore`] -- the metadata store for packages, unique by
//!   `(owner_id, reference)`.
//! - [`VersionStore`] -- the blob store for versions, persisting content and
//!   metadata as one logical unit, unique by
//!   `(owner_id, package_ref, version_id)`.
//!
//! # Storage Backends
//!
//! - [`InMemoryPackageStore`] / [`InMemoryVersionStore`] -- `RwLock`-guarded
//!   tables for tests and embedding
//! - [`FsPackageStore`] / [`FsVersionStore`] -- JSON records and blob files
//!   under a data directory
//!
//! # Design Rules
//!
//! 1. Uniqueness is enforced atomically at write time, never by a separate
//!    check-then-insert.
//! 2. Content streams through a [`ChecksumReader`]; length and MD5 are
//!    computed as bytes pass, never by buffering the whole artifact first.
//! 3. Content and metadata of a version become visible together. A create
//!    that loses a uniqueness race leaves nothing retrievable behind.
//! 4. Lookups return `Ok(None)` when nothing matches and open no stream.
//! 5. Listings are owner-scoped and ordered by insertion.
//! 6. Backend-specific conflict signals never escape: they surface as
//!    [`StoreError::Conflict`]. All other failures propagate unmodified.

pub mod checksum;
pub mod error;
pub mod fs;
pub mod key;
mod layout;
pub mod memory;
pub mod traits;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use checksum::{ChecksumReader, ContentDigest};
pub use error::{Attempted, Conflict, StoreError, StoreResult, UniqueViolation};
pub use fs::{FsPackageStore, FsVersionStore};
pub use key::{PackageKey, VersionKey};
pub use memory::{InMemoryPackageStore, InMemoryVersionStore};
pub use traits::{ContentReader, PackageStore, StoredVersion, VersionStore};
