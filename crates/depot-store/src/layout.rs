//! On-disk layout shared by the filesystem stores.
//!
//! ```text
//! <root>/packages/<owner digest>/<key digest>.json
//! <root>/versions/<package digest>/<key digest>.json
//! <root>/blobs/<blob uuid>
//! ```
//!
//! Keys are arbitrary printable strings up to 140 characters, too long and
//! too free-form for file names, so every path component is a
//! domain-separated BLAKE3 digest of length-prefixed key parts. Records carry
//! their full key, which is checked on read.
//!
//! Files are staged as dot-prefixed temporaries in their final directory and
//! published with a no-clobber persist, so a record is either absent or
//! complete, and publishing onto an existing name fails with `AlreadyExists`.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{StoreError, StoreResult};

pub(crate) const RECORD_EXT: &str = "json";
const STAGING_PREFIX: &str = ".staging-";

pub(crate) const OWNER_DOMAIN: &str = "depot-owner-v1";
pub(crate) const PACKAGE_DOMAIN: &str = "depot-package-v1";
pub(crate) const VERSION_DOMAIN: &str = "depot-version-v1";

/// Hex BLAKE3 digest of `parts` under `domain`.
///
/// Each part is length-prefixed so `("ab", "c")` and `("a", "bc")` differ.
pub(crate) fn digest(domain: &str, parts: &[&str]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(domain.as_bytes());
    hasher.update(b":");
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

pub(crate) fn record_path(dir: &Path, key_digest: &str) -> PathBuf {
    dir.join(format!("{key_digest}.{RECORD_EXT}"))
}

/// Stage a new file in `dir` with the given writer.
pub(crate) fn stage<F>(dir: &Path, write: F) -> io::Result<NamedTempFile>
where
    F: FnOnce(&mut NamedTempFile) -> io::Result<()>,
{
    fs::create_dir_all(dir)?;
    let mut tmp = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempfile_in(dir)?;
    write(&mut tmp)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    Ok(tmp)
}

/// Atomically publish a staged file at `target`, failing with
/// `AlreadyExists` if anything is already there.
pub(crate) fn publish(staged: NamedTempFile, target: &Path) -> io::Result<()> {
    staged
        .persist_noclobber(target)
        .map(|_| ())
        .map_err(|e| e.error)
}

pub(crate) fn encode<T: Serialize>(record: &T) -> StoreResult<Vec<u8>> {
    serde_json::to_vec_pretty(record).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Read and decode the record at `path`; `None` when the file is absent.
pub(crate) fn read_record<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Decode every published record in `dir`. A missing directory is an
/// empty scope.
pub(crate) fn read_scope<T: DeserializeOwned>(dir: &Path) -> StoreResult<Vec<T>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut records = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let published = path.extension().is_some_and(|ext| ext == RECORD_EXT)
            && !path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(STAGING_PREFIX));
        if !published {
            continue;
        }
        // A record can only vanish if someone edits the data directory by
        // hand; treat it as never listed.
        if let Some(record) = read_record(&path)? {
            records.push(record);
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_separates_parts_and_domains() {
        let a = digest(PACKAGE_DOMAIN, &["ab", "c"]);
        let b = digest(PACKAGE_DOMAIN, &["a", "bc"]);
        assert_ne!(a, b);
        assert_ne!(a, digest(VERSION_DOMAIN, &["ab", "c"]));
        assert_eq!(a, digest(PACKAGE_DOMAIN, &["ab", "c"]));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn publish_refuses_to_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("record.json");

        let first = stage(dir.path(), |f| f.write_all(b"one")).unwrap();
        publish(first, &target).unwrap();

        let second = stage(dir.path(), |f| f.write_all(b"two")).unwrap();
        let err = publish(second, &target).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&target).unwrap(), b"one");
    }

    #[test]
    fn scope_skips_staging_files_and_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let missing: Vec<serde_json::Value> = read_scope(&dir.path().join("nope")).unwrap();
        assert!(missing.is_empty());

        let staged = stage(dir.path(), |f| f.write_all(b"{}")).unwrap();
        fs::write(record_path(dir.path(), "abc"), br#"{"n":1}"#).unwrap();

        let records: Vec<serde_json::Value> = read_scope(dir.path()).unwrap();
        assert_eq!(records.len(), 1);
        drop(staged);
    }

    #[test]
    fn malformed_record_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = record_path(dir.path(), "bad");
        fs::write(&path, b"not json").unwrap();
        let err = read_record::<serde_json::Value>(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}
