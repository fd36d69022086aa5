//! Compound uniqueness keys.

use std::fmt;

use depot_types::{Package, Version};

/// Identity of a package: `(owner_id, reference)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageKey {
    pub owner_id: String,
    pub reference: String,
}

impl PackageKey {
    pub fn new(owner_id: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            reference: reference.into(),
        }
    }

    pub fn of(package: &Package) -> Self {
        Self::new(&package.owner_id, &package.reference)
    }

    pub fn matches(&self, package: &Package) -> bool {
        self.owner_id == package.owner_id && self.reference == package.reference
    }
}

impl fmt::Display for PackageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner_id, self.reference)
    }
}

/// Identity of a version: `(owner_id, package_ref, version_id)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionKey {
    pub owner_id: String,
    pub package_ref: String,
    pub version_id: String,
}

impl VersionKey {
    pub fn new(
        owner_id: impl Into<String>,
        package_ref: impl Into<String>,
        version_id: impl Into<String>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            package_ref: package_ref.into(),
            version_id: version_id.into(),
        }
    }

    pub fn of(version: &Version) -> Self {
        Self::new(&version.owner_id, &version.package_ref, &version.version_id)
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.owner_id == version.owner_id
            && self.package_ref == version.package_ref
            && self.version_id == version.version_id
    }

    /// The package scope this version lives in.
    pub fn package(&self) -> PackageKey {
        PackageKey::new(&self.owner_id, &self.package_ref)
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.owner_id, self.package_ref, self.version_id)
    }
}
