use serde::{Deserialize, Serialize};

/// An owner-scoped, named collection under which versions are published.
///
/// The pair `(owner_id, reference)` is unique across all packages. A package
/// is created once and never mutated or deleted.
///
/// `owner_id` comes from the caller's context and is never part of the wire
/// format: it is skipped on serialization and left empty on deserialization.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Package {
    #[serde(skip)]
    pub owner_id: String,
    pub reference: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Package {
    /// Create a package without a description.
    pub fn new(
        owner_id: impl Into<String>,
        reference: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            reference: reference.into(),
            name: name.into(),
            description: None,
        }
    }

    /// Builder-style setter for the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Return a copy bound to `owner_id`.
    pub fn owned_by(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = owner_id.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let p = Package::new("owner-1", "ref-1", "Firmware").with_description("Main board");
        assert_eq!(p.owner_id, "owner-1");
        assert_eq!(p.reference, "ref-1");
        assert_eq!(p.name, "Firmware");
        assert_eq!(p.description.as_deref(), Some("Main board"));
    }

    #[test]
    fn owner_id_is_never_serialized() {
        let p = Package::new("secret-owner", "ref", "name");
        let json = serde_json::to_value(&p).unwrap();
        assert!(json.get("owner_id").is_none());
        assert!(json.get("ownerId").is_none());
        assert_eq!(json["reference"], "ref");
        assert_eq!(json["name"], "name");
        assert!(json.get("description").is_none());
    }

    #[test]
    fn deserialized_package_has_no_owner() {
        let p: Package =
            serde_json::from_str(r#"{"reference":"r","name":"n","ownerId":"x"}"#).unwrap();
        assert!(p.owner_id.is_empty());
        assert_eq!(p.description, None);

        let owned = p.owned_by("o");
        assert_eq!(owned.owner_id, "o");
    }
}
