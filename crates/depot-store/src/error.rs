use std::fmt;
use std::path::PathBuf;

use depot_types::{EntityKind, Package, Version};

use crate::key::{PackageKey, VersionKey};

/// Name of the unique index over `(owner_id, reference)`.
pub const PACKAGE_UNIQUE_INDEX: &str = "owner_reference_idx";

/// Name of the unique index over `(owner_id, package_ref, version_id)`.
pub const VERSION_UNIQUE_INDEX: &str = "owner_package_version_idx";

/// The storage-level signal behind a [`Conflict`].
///
/// Opaque to callers beyond its display form; backends fill it in from
/// whatever their persistence layer reports.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unique index `{index}` violated by key {key}: {detail}")]
pub struct UniqueViolation {
    pub index: &'static str,
    pub key: String,
    pub detail: String,
}

/// The entity whose create was rejected.
#[derive(Clone, Debug, PartialEq)]
pub enum Attempted {
    Package(Package),
    Version(Box<Version>),
}

impl Attempted {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Package(_) => EntityKind::Package,
            Self::Version(_) => EntityKind::Version,
        }
    }

    pub fn package(&self) -> Option<&Package> {
        match self {
            Self::Package(p) => Some(p),
            Self::Version(_) => None,
        }
    }

    pub fn version(&self) -> Option<&Version> {
        match self {
            Self::Package(_) => None,
            Self::Version(v) => Some(v),
        }
    }
}

impl fmt::Display for Attempted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Package(p) => write!(f, "{}", PackageKey::of(p)),
            Self::Version(v) => write!(f, "{}", VersionKey::of(v)),
        }
    }
}

/// A create hit an existing record with the same compound key.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{} already exists: {attempted}", .attempted.kind())]
pub struct Conflict {
    pub attempted: Attempted,
    #[source]
    pub cause: UniqueViolation,
}

impl Conflict {
    pub(crate) fn package(package: &Package, detail: impl Into<String>) -> Self {
        Self {
            attempted: Attempted::Package(package.clone()),
            cause: UniqueViolation {
                index: PACKAGE_UNIQUE_INDEX,
                key: PackageKey::of(package).to_string(),
                detail: detail.into(),
            },
        }
    }

    pub(crate) fn version(version: &Version, detail: impl Into<String>) -> Self {
        Self {
            attempted: Attempted::Version(Box::new(version.clone())),
            cause: UniqueViolation {
                index: VERSION_UNIQUE_INDEX,
                key: VersionKey::of(version).to_string(),
                detail: detail.into(),
            },
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.attempted.kind()
    }
}

/// Errors from package and version store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected a create.
    #[error(transparent)]
    Conflict(#[from] Conflict),

    /// I/O error from the underlying storage or the content stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A persisted record cannot be decoded or does not match its location.
    #[error("corrupt record {}: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// A thread panicked while holding the store lock.
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
