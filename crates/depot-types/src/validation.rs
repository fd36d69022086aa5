//! Field constraints for packages and versions.
//!
//! These checks run at the edge, before a value reaches a store. The core
//! assumes every value it receives has already passed them.

use crate::error::{FieldViolation, ValidationError};
use crate::package::Package;
use crate::version::Version;

/// Maximum length of references, identifiers, and names.
pub const MAX_NAME_LEN: usize = 140;

/// Maximum length of descriptions.
pub const MAX_DESCRIPTION_LEN: usize = 1000;

/// Validate a package's client-supplied fields.
pub fn validate_package(package: &Package) -> Result<(), ValidationError> {
    let mut v = Violations::default();
    v.identifier("reference", &package.reference);
    v.name("name", &package.name);
    v.description(package.description.as_deref());
    v.finish()
}

/// Validate a version's client-supplied fields.
pub fn validate_version(version: &Version) -> Result<(), ValidationError> {
    let mut v = Violations::default();
    v.identifier("id", &version.version_id);
    v.name("name", &version.name);
    v.description(version.description.as_deref());
    v.not_blank("filename", &version.filename);
    v.finish()
}

/// Printable ASCII: space through tilde.
pub fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7e).contains(&b))
}

#[derive(Default)]
struct Violations(Vec<FieldViolation>);

impl Violations {
    fn not_blank(&mut self, field: &'static str, value: &str) -> bool {
        if value.trim().is_empty() {
            self.0.push(FieldViolation::new(field, "must not be blank"));
            return false;
        }
        true
    }

    fn max_len(&mut self, field: &'static str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.0
                .push(FieldViolation::new(field, format!("size must be at most {max}")));
        }
    }

    fn name(&mut self, field: &'static str, value: &str) {
        if self.not_blank(field, value) {
            self.max_len(field, value, MAX_NAME_LEN);
        }
    }

    fn identifier(&mut self, field: &'static str, value: &str) {
        if !self.not_blank(field, value) {
            return;
        }
        self.max_len(field, value, MAX_NAME_LEN);
        if !is_printable_ascii(value) {
            self.0.push(FieldViolation::new(
                field,
                "must be composed of ASCII characters only",
            ));
        }
    }

    fn description(&mut self, value: Option<&str>) {
        if let Some(d) = value {
            self.max_len("description", d, MAX_DESCRIPTION_LEN);
        }
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { violations: self.0 })
        }
    }
}
