use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A scalar value stored in a version's metadata map.
///
/// Stores treat metadata as opaque; only the transport layer interprets it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    /// Integers above `i64::MAX`.
    Unsigned(u64),
    Float(f64),
    String(String),
    Null,
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<u64> for MetadataValue {
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or(Self::Unsigned(v), Self::Integer)
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

/// Open map of scalar metadata attached to a version.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Metadata of an immutable binary artifact published under a package.
///
/// The triple `(owner_id, package_ref, version_id)` is unique. `length` and
/// `checksum` are computed by the store while the content streams in; values
/// supplied by a caller on create are ignored. The content itself is not part
/// of this struct: single-version lookups pair it with a reader, listings
/// never open one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    #[serde(skip)]
    pub owner_id: String,
    pub package_ref: String,
    #[serde(rename = "id")]
    pub version_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub filename: String,
    #[serde(default)]
    pub length: u64,
    #[serde(default)]
    pub checksum: String,
}

impl Version {
    /// Create a version with empty metadata and no computed content fields.
    pub fn new(
        owner_id: impl Into<String>,
        package_ref: impl Into<String>,
        version_id: impl Into<String>,
        name: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            package_ref: package_ref.into(),
            version_id: version_id.into(),
            name: name.into(),
            description: None,
            metadata: Metadata::new(),
            filename: filename.into(),
            length: 0,
            checksum: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Return a copy carrying the length and checksum computed for its content.
    pub fn with_content_digest(mut self, length: u64, checksum: impl Into<String>) -> Self {
        self.length = length;
        self.checksum = checksum.into();
        self
    }

    /// Return a copy bound to `owner_id`.
    pub fn owned_by(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = owner_id.into();
        self
    }
}
