//! Package and version services for Depot.
//!
//! Thin orchestration over the stores in `depot-store`: lookups turn absent
//! records into [`NotFound`] errors, and version creation first checks that
//! the owning package exists. Validation is the caller's job; values reaching
//! a service are assumed to be well-formed.

pub mod error;
pub mod package;
pub mod version;

pub use error::{NotFound, ServiceError, ServiceResult};
pub use package::PackageService;
pub use version::VersionService;

pub use depot_store::{ContentReader, StoredVersion};
