use depot_store::{Conflict, StoreError};
use depot_types::{EntityKind, Version};
use thiserror::Error;

/// A lookup by key matched nothing.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum NotFound {
    #[error("package {owner_id}/{reference} not found")]
    Package { owner_id: String, reference: String },

    #[error("version {owner_id}/{package_ref}/{version_id} not found")]
    Version {
        owner_id: String,
        package_ref: String,
        version_id: String,
    },
}

impl NotFound {
    pub fn package(owner_id: impl Into<String>, reference: impl Into<String>) -> Self {
        Self::Package {
            owner_id: owner_id.into(),
            reference: reference.into(),
        }
    }

    pub fn version(
        owner_id: impl Into<String>,
        package_ref: impl Into<String>,
        version_id: impl Into<String>,
    ) -> Self {
        Self::Version {
            owner_id: owner_id.into(),
            package_ref: package_ref.into(),
            version_id: version_id.into(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Package { .. } => EntityKind::Package,
            Self::Version { .. } => EntityKind::Version,
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    NotFound(NotFound),

    #[error(transparent)]
    Conflict(Conflict),

    /// A version was submitted under a package that does not exist.
    #[error("cannot create version {}: {source}", .version.version_id)]
    CreationFailed {
        version: Box<Version>,
        #[source]
        source: NotFound,
    },

    #[error("storage error: {0}")]
    Storage(#[source] StoreError),
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<NotFound> for ServiceError {
    fn from(e: NotFound) -> Self {
        Self::NotFound(e)
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(conflict) => Self::Conflict(conflict),
            other => Self::Storage(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_conflicts_stay_conflicts() {
        let err: ServiceError = StoreError::LockPoisoned.into();
        assert!(matches!(err, ServiceError::Storage(StoreError::LockPoisoned)));

        let io = std::io::Error::other("disk");
        assert!(matches!(ServiceError::from(StoreError::from(io)), ServiceError::Storage(_)));
    }

    #[test]
    fn creation_failed_names_version_and_cause() {
        let err = ServiceError::CreationFailed {
            version: Box::new(Version::new("o", "missing", "1.0", "n", "f")),
            source: NotFound::package("o", "missing"),
        };
        assert_eq!(
            err.to_string(),
            "cannot create version 1.0: package o/missing not found"
        );
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("package o/missing not found"));
    }

    #[test]
    fn not_found_kind() {
        assert_eq!(NotFound::package("o", "r").kind(), EntityKind::Package);
        assert_eq!(NotFound::version("o", "r", "1").kind(), EntityKind::Version);
    }
}
