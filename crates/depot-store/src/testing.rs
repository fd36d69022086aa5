//! Backend conformance suite.
//!
//! Every [`PackageStore`] and [`VersionStore`] implementation runs the same
//! checks from its own test module with a fresh store. Enable the `testing`
//! feature to call these from other crates.
//!
//! Each check works under its own owner id, so the checks can share one store.

use std::io::Read;
use std::sync::{Arc, Barrier};
use std::thread;

use depot_types::{Package, PageRequest, Version};

use crate::error::{StoreError, StoreResult};
use crate::traits::{PackageStore, VersionStore};

const RACERS: usize = 8;

/// Run the full package store conformance suite.
///
/// # Errors
///
/// Returns the first store error a check runs into; assertion failures panic.
pub fn run_package_store_conformance(store: &dyn PackageStore) -> StoreResult<()> {
    package_find_missing(store)?;
    package_create_then_find(store)?;
    package_duplicate_conflicts(store)?;
    package_owners_are_isolated(store)?;
    package_list_pages_in_insertion_order(store)?;
    package_list_beyond_range(store)?;
    Ok(())
}

/// Run the full version store conformance suite.
///
/// # Errors
///
/// Returns the first store error a check runs into; assertion failures panic.
pub fn run_version_store_conformance(store: &dyn VersionStore) -> StoreResult<()> {
    version_find_missing(store)?;
    version_create_computes_digest(store)?;
    version_content_round_trips(store)?;
    version_metadata_matches_find(store)?;
    version_lookups_are_independent(store)?;
    version_duplicate_keeps_first(store)?;
    version_caller_digest_is_ignored(store)?;
    version_list_is_scoped_and_ordered(store)?;
    version_empty_content(store)?;
    Ok(())
}

/// Race [`RACERS`] threads creating the same package; exactly one may win.
///
/// # Errors
///
/// Returns any non-conflict error a racer hits.
pub fn concurrent_package_creates<S>(store: Arc<S>) -> StoreResult<()>
where
    S: PackageStore + 'static,
{
    let barrier = Arc::new(Barrier::new(RACERS));
    let handles: Vec<_> = (0..RACERS)
        .map(|i| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let package = Package::new("race-owner", "contested", format!("racer {i}"));
                barrier.wait();
                store.create(&package)
            })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        match handle.join().map_err(|_| StoreError::LockPoisoned)? {
            Ok(_) => winners += 1,
            Err(e) if e.is_conflict() => {}
            Err(e) => return Err(e),
        }
    }
    assert_eq!(winners, 1, "exactly one concurrent create should succeed");

    let page = store.list("race-owner", PageRequest::default())?;
    assert_eq!(page.total, 1);
    Ok(())
}

/// Race [`RACERS`] threads creating the same version with different content.
///
/// Exactly one create may win, and the stored content must be the winner's.
///
/// # Errors
///
/// Returns any non-conflict error a racer hits.
pub fn concurrent_version_creates<S>(store: Arc<S>) -> StoreResult<()>
where
    S: VersionStore + 'static,
{
    let barrier = Arc::new(Barrier::new(RACERS));
    let handles: Vec<_> = (0..RACERS)
        .map(|i| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let version = Version::new("race-owner", "pkg", "1.0.0", "racer", "a.bin");
                let content = format!("content of racer {i}").into_bytes();
                barrier.wait();
                store
                    .create(&version, &mut content.as_slice())
                    .map(|stored| (stored, content))
            })
        })
        .collect();

    let mut winner = None;
    for handle in handles {
        match handle.join().map_err(|_| StoreError::LockPoisoned)? {
            Ok(won) => {
                assert!(winner.is_none(), "more than one concurrent create succeeded");
                winner = Some(won);
            }
            Err(e) if e.is_conflict() => {}
            Err(e) => return Err(e),
        }
    }
    let (stored, content) = winner.expect("one concurrent create should succeed");

    let found = store
        .find("race-owner", "pkg", "1.0.0")?
        .expect("winning version should be retrievable");
    assert_eq!(found.version, stored);
    assert_eq!(found.read_to_vec()?, content);
    Ok(())
}

// ---------------------------------------------------------------------------
// Packages
// ---------------------------------------------------------------------------

fn package_find_missing(store: &dyn PackageStore) -> StoreResult<()> {
    assert!(store.find("find-missing", "nothing")?.is_none());
    let page = store.list("find-missing", PageRequest::default())?;
    assert!(page.is_empty());
    assert_eq!(page.total, 0);
    Ok(())
}

fn package_create_then_find(store: &dyn PackageStore) -> StoreResult<()> {
    let package = Package::new("create-find", "app", "Application").with_description("desc");
    let created = store.create(&package)?;
    assert_eq!(created, package);

    let found = store.find("create-find", "app")?;
    assert_eq!(found.as_ref(), Some(&package));
    Ok(())
}

fn package_duplicate_conflicts(store: &dyn PackageStore) -> StoreResult<()> {
    let first = Package::new("duplicate", "app", "First");
    store.create(&first)?;

    let second = Package::new("duplicate", "app", "Second");
    match store.create(&second) {
        Err(StoreError::Conflict(conflict)) => {
            assert_eq!(conflict.attempted.package(), Some(&second));
        }
        other => panic!("expected conflict, got {other:?}"),
    }

    assert_eq!(store.find("duplicate", "app")?, Some(first));
    assert_eq!(store.list("duplicate", PageRequest::default())?.total, 1);
    Ok(())
}

fn package_owners_are_isolated(store: &dyn PackageStore) -> StoreResult<()> {
    let a = Package::new("isolated-a", "shared", "A's package");
    let b = Package::new("isolated-b", "shared", "B's package");
    store.create(&a)?;
    store.create(&b)?;

    assert_eq!(store.find("isolated-a", "shared")?, Some(a));
    assert_eq!(store.find("isolated-b", "shared")?, Some(b));

    let listed = store.list("isolated-a", PageRequest::default())?;
    assert_eq!(listed.total, 1);
    assert!(listed.items.iter().all(|p| p.owner_id == "isolated-a"));
    Ok(())
}

fn package_list_pages_in_insertion_order(store: &dyn PackageStore) -> StoreResult<()> {
    let owner = "paging";
    let refs: Vec<String> = (0..10).map(|i| format!("pkg-{i}")).collect();
    for reference in &refs {
        store.create(&Package::new(owner, reference.as_str(), "n"))?;
    }

    let first = store.list(owner, PageRequest::page(0, 5))?;
    assert_eq!(first.len(), 5);
    assert_eq!(first.total, 10);
    assert!(first.has_next());

    let second = store.list(owner, first.request.next())?;
    assert_eq!(second.len(), 5);
    assert!(!second.has_next());

    let seen: Vec<&str> = first
        .items
        .iter()
        .chain(second.items.iter())
        .map(|p| p.reference.as_str())
        .collect();
    let expected: Vec<&str> = refs.iter().map(String::as_str).collect();
    assert_eq!(seen, expected, "listing should follow insertion order");
    Ok(())
}

fn package_list_beyond_range(store: &dyn PackageStore) -> StoreResult<()> {
    let owner = "beyond-range";
    for i in 0..3 {
        store.create(&Package::new(owner, format!("r{i}"), "n"))?;
    }
    let page = store.list(owner, PageRequest::page(7, 5))?;
    assert!(page.is_empty());
    assert_eq!(page.total, 3);
    Ok(())
}

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

fn version_find_missing(store: &dyn VersionStore) -> StoreResult<()> {
    assert!(store.find("v-missing", "pkg", "1")?.is_none());
    assert!(store.find_metadata("v-missing", "pkg", "1")?.is_none());
    let page = store.list("v-missing", "pkg", PageRequest::default())?;
    assert!(page.is_empty());
    assert_eq!(page.total, 0);
    Ok(())
}

fn version_create_computes_digest(store: &dyn VersionStore) -> StoreResult<()> {
    let version = Version::new("v-digest", "pkg", "1.0", "abc", "abc.txt")
        .with_description("three bytes")
        .with_metadata("arch", "x86_64")
        .with_metadata("build", 42i64);
    let stored = store.create(&version, &mut &b"abc"[..])?;

    assert_eq!(stored.length, 3);
    assert_eq!(stored.checksum, "900150983cd24fb0d6963f7d28e17f72");
    assert_eq!(stored.owner_id, "v-digest");
    assert_eq!(stored.metadata, version.metadata);
    assert_eq!(stored.description, version.description);
    Ok(())
}

fn version_content_round_trips(store: &dyn VersionStore) -> StoreResult<()> {
    let content: Vec<u8> = (0..200_000u32).map(|i| (i % 253) as u8).collect();
    let version = Version::new("v-round-trip", "pkg", "2.0", "big", "big.bin");
    let stored = store.create(&version, &mut content.as_slice())?;
    assert_eq!(stored.length, content.len() as u64);

    let found = store
        .find("v-round-trip", "pkg", "2.0")?
        .expect("stored version should be found");
    assert_eq!(found.version, stored);
    assert_eq!(found.read_to_vec()?, content);
    Ok(())
}

fn version_metadata_matches_find(store: &dyn VersionStore) -> StoreResult<()> {
    let version = Version::new("v-metadata", "pkg", "1", "n", "f").with_metadata("rc", true);
    let stored = store.create(&version, &mut &b"xyz"[..])?;

    let metadata = store
        .find_metadata("v-metadata", "pkg", "1")?
        .expect("stored version should be found");
    assert_eq!(metadata, stored);
    let found = store
        .find("v-metadata", "pkg", "1")?
        .expect("stored version should be found");
    assert_eq!(found.version, metadata);
    assert!(store.find_metadata("v-metadata", "pkg", "2")?.is_none());
    Ok(())
}

fn version_lookups_are_independent(store: &dyn VersionStore) -> StoreResult<()> {
    let version = Version::new("v-independent", "pkg", "1", "n", "f");
    store.create(&version, &mut &b"payload"[..])?;

    let mut first = store
        .find("v-independent", "pkg", "1")?
        .expect("stored version should be found");
    let mut partial = [0u8; 3];
    first.content.read_exact(&mut partial)?;
    drop(first);

    let second = store
        .find("v-independent", "pkg", "1")?
        .expect("stored version should be found");
    assert_eq!(second.read_to_vec()?, b"payload");
    Ok(())
}

fn version_duplicate_keeps_first(store: &dyn VersionStore) -> StoreResult<()> {
    let first = Version::new("v-duplicate", "pkg", "1", "first", "a.bin");
    store.create(&first, &mut &b"first content"[..])?;

    let second = Version::new("v-duplicate", "pkg", "1", "second", "b.bin");
    match store.create(&second, &mut &b"second content"[..]) {
        Err(StoreError::Conflict(conflict)) => {
            let attempted = conflict
                .attempted
                .version()
                .expect("version conflict should carry the attempted version");
            assert_eq!(attempted.name, "second");
        }
        other => panic!("expected conflict, got {other:?}"),
    }

    let found = store
        .find("v-duplicate", "pkg", "1")?
        .expect("first version should remain");
    assert_eq!(found.version.name, "first");
    assert_eq!(found.read_to_vec()?, b"first content");
    assert_eq!(store.list("v-duplicate", "pkg", PageRequest::default())?.total, 1);
    Ok(())
}

fn version_caller_digest_is_ignored(store: &dyn VersionStore) -> StoreResult<()> {
    let version = Version::new("v-caller-digest", "pkg", "1", "n", "f")
        .with_content_digest(999, "not-a-checksum");
    let stored = store.create(&version, &mut &b"abc"[..])?;
    assert_eq!(stored.length, 3);
    assert_eq!(stored.checksum, "900150983cd24fb0d6963f7d28e17f72");
    Ok(())
}

fn version_list_is_scoped_and_ordered(store: &dyn VersionStore) -> StoreResult<()> {
    let owner = "v-listing";
    for id in ["1.0", "1.1", "2.0"] {
        store.create(&Version::new(owner, "pkg", id, "n", "f"), &mut id.as_bytes())?;
    }
    store.create(&Version::new(owner, "other", "9.9", "n", "f"), &mut &b"x"[..])?;
    store.create(&Version::new("v-listing-b", "pkg", "1.0", "n", "f"), &mut &b"x"[..])?;

    let page = store.list(owner, "pkg", PageRequest::page(0, 2))?;
    assert_eq!(page.total, 3);
    let ids: Vec<&str> = page.items.iter().map(|v| v.version_id.as_str()).collect();
    assert_eq!(ids, ["1.0", "1.1"]);

    let rest = store.list(owner, "pkg", page.request.next())?;
    assert_eq!(rest.items.len(), 1);
    assert_eq!(rest.items[0].version_id, "2.0");
    assert_eq!(rest.items[0].length, 3);
    Ok(())
}

fn version_empty_content(store: &dyn VersionStore) -> StoreResult<()> {
    let version = Version::new("v-empty", "pkg", "0", "empty", "empty.bin");
    let stored = store.create(&version, &mut std::io::empty())?;
    assert_eq!(stored.length, 0);
    assert_eq!(stored.checksum, "d41d8cd98f00b204e9800998ecf8427e");

    let found = store
        .find("v-empty", "pkg", "0")?
        .expect("empty version should be found");
    assert!(found.read_to_vec()?.is_empty());
    Ok(())
}
