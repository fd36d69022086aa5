//! Foundation types for Depot.
//!
//! Depot lets an owner register named packages and attach immutable binary
//! versions to them. This crate holds the data model shared by the storage,
//! service, and transport layers. Every other Depot crate depends on
//! `depot-types`.
//!
//! # Key Types
//!
//! - [`Package`] -- Owner-scoped named collection, unique by `(owner_id, reference)`
//! - [`Version`] -- Immutable artifact metadata, unique by `(owner_id, package_ref, version_id)`
//! - [`MetadataValue`] -- Scalar value in a version's open metadata map
//! - [`PageRequest`] / [`Page`] -- Offset pagination and paged results
//! - [`EntityKind`] -- Discriminates packages from versions in errors and logs
//!
//! Field constraints (lengths, charset, blankness) live in [`validation`].
//! Stores and services never re-validate; the transport layer calls the
//! validators before handing values to the core.

pub mod entity;
pub mod error;
pub mod package;
pub mod page;
pub mod validation;
pub mod version;

pub use entity::EntityKind;
pub use error::{FieldViolation, ValidationError};
pub use package::Package;
pub use page::{Page, PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use validation::{validate_package, validate_version};
pub use version::{Metadata, MetadataValue, Version};
