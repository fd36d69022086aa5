//! Request and response bodies of the HTTP API.

use depot_types::{Metadata, Package, Page, PageRequest, Version};
use serde::{Deserialize, Deserializer, Serialize};

/// Body of `POST /owners/:owner/packages`.
///
/// The reference is stripped of all whitespace on decode. Missing fields
/// decode as empty and are rejected by validation, not by the decoder.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewPackage {
    #[serde(deserialize_with = "strip_whitespace")]
    pub reference: String,
    pub name: String,
    pub description: Option<String>,
}

impl NewPackage {
    pub fn into_package(self, owner_id: &str) -> Package {
        Package {
            owner_id: owner_id.to_string(),
            reference: self.reference,
            name: self.name,
            description: self.description,
        }
    }
}

fn strip_whitespace<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect())
}

/// The `version` part of a version upload.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewVersion {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub metadata: Metadata,
}

impl NewVersion {
    /// Bind the submitted fields to their owner, package, and uploaded file.
    pub fn into_version(self, owner_id: &str, package_ref: &str, filename: String) -> Version {
        let mut version = Version::new(owner_id, package_ref, self.id, self.name, filename);
        version.description = self.description;
        version.metadata = self.metadata;
        version
    }
}

/// `?page=&size=` query parameters. Absent values fall back to the first
/// page and the configured default size.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u64>,
    pub size: Option<u64>,
}

impl PageParams {
    pub fn to_request(self, default_size: u64) -> PageRequest {
        PageRequest::page(self.page.unwrap_or(0), self.size.unwrap_or(default_size))
    }
}

/// A listing page on the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PagedBody<T> {
    pub items: Vec<T>,
    pub page: PageMeta,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub number: u64,
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> From<Page<T>> for PagedBody<T> {
    fn from(page: Page<T>) -> Self {
        let meta = PageMeta {
            number: page.request.number(),
            size: page.request.limit(),
            total_elements: page.total,
            total_pages: page.total_pages(),
        };
        Self {
            items: page.items,
            page: meta,
        }
    }
}
