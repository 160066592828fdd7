//! End-to-end scenarios against the public [`filekv::Store`] API, using a
//! fresh `tempfile` database per test.

use filekv::{Store, StoreError};
use tempfile::tempdir;

fn scratch_path(dir: &tempfile::TempDir, name: &str) -> std::path::PathBuf {
    dir.path().join(name)
}

/// S1: basic put/get, then close and reopen, values survive.
#[test]
fn s1_basic_put_get_across_reopen() {
    let dir = tempdir().unwrap();
    let path = scratch_path(&dir, "t.db");

    let mut store = Store::create(&path).unwrap();
    store.put(b"foo", b"hello").unwrap();
    store.put(b"bar", b"world").unwrap();
    assert_eq!(store.get(b"foo").unwrap(), Some(b"hello".to_vec()));
    assert_eq!(store.get(b"bar").unwrap(), Some(b"world".to_vec()));
    store.close();

    let mut store = Store::open(&path).unwrap();
    assert_eq!(store.get(b"foo").unwrap(), Some(b"hello".to_vec()));
    assert_eq!(store.get(b"bar").unwrap(), Some(b"world".to_vec()));
}

/// S2: delete then reput resurrects the key.
#[test]
fn s2_delete_then_reput() {
    let dir = tempdir().unwrap();
    let path = scratch_path(&dir, "t.db");
    let mut store = Store::create(&path).unwrap();

    store.put(b"foo", b"1").unwrap();
    store.delete(b"foo").unwrap();
    assert_eq!(store.get(b"foo").unwrap(), None);

    store.put(b"foo", b"2").unwrap();
    assert_eq!(store.get(b"foo").unwrap(), Some(b"2".to_vec()));
}

/// S3: multiple updates, last-writer-wins, then delete hides the key.
#[test]
fn s3_multiple_updates_then_delete() {
    let dir = tempdir().unwrap();
    let path = scratch_path(&dir, "t.db");
    let mut store = Store::create(&path).unwrap();

    store.put(b"bar", b"a").unwrap();
    store.put(b"bar", b"b").unwrap();
    store.put(b"bar", b"c").unwrap();
    assert_eq!(store.get(b"bar").unwrap(), Some(b"c".to_vec()));

    store.delete(b"bar").unwrap();
    assert_eq!(store.get(b"bar").unwrap(), None);
}

/// S4: 50 keys cross the 0.7 load factor at capacity 31, triggering a
/// rehash to 62; every key must still be retrievable afterwards.
#[test]
fn s4_fifty_keys_trigger_rehash() {
    let dir = tempdir().unwrap();
    let path = scratch_path(&dir, "t.db");
    let mut store = Store::create(&path).unwrap();

    for i in 0..50 {
        let key = format!("resize_key_{:03}", i);
        let value = format!("resize_value_{:03}", i);
        store.put(key.as_bytes(), value.as_bytes()).unwrap();
    }

    for i in 0..50 {
        let key = format!("resize_key_{:03}", i);
        let value = format!("resize_value_{:03}", i);
        assert_eq!(
            store.get(key.as_bytes()).unwrap(),
            Some(value.into_bytes())
        );
    }
}

/// S5: deleting a never-inserted key fails; a subsequent get is not-found.
#[test]
fn s5_delete_never_inserted_key() {
    let dir = tempdir().unwrap();
    let path = scratch_path(&dir, "t.db");
    let mut store = Store::create(&path).unwrap();

    assert!(matches!(store.delete(b"nope"), Err(StoreError::KeyNotFound)));
    assert_eq!(store.get(b"nope").unwrap(), None);
}

/// S6: a tombstone survives two reopen cycles.
#[test]
fn s6_tombstone_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = scratch_path(&dir, "t.db");

    {
        let mut store = Store::create(&path).unwrap();
        store.put(b"k", b"v1").unwrap();
        store.close();
    }
    {
        let mut store = Store::open(&path).unwrap();
        store.delete(b"k").unwrap();
        store.close();
    }
    let mut store = Store::open(&path).unwrap();
    assert_eq!(store.get(b"k").unwrap(), None);
}

/// Property: round-tripping arbitrary bytes, including embedded zeros and
/// non-UTF-8 sequences, through put/get.
#[test]
fn round_trips_arbitrary_bytes_including_embedded_zeros() {
    let dir = tempdir().unwrap();
    let path = scratch_path(&dir, "t.db");
    let mut store = Store::create(&path).unwrap();

    let key = vec![0xff, 0x00, 0x01, 0xfe];
    let value = vec![0u8, 0, 0, 1, 2, 3, 0, 255];
    store.put(&key, &value).unwrap();
    assert_eq!(store.get(&key).unwrap(), Some(value));
}

/// Property: empty keys are rejected for every operation without mutating
/// state.
#[test]
fn empty_key_is_rejected_everywhere() {
    let dir = tempdir().unwrap();
    let path = scratch_path(&dir, "t.db");
    let mut store = Store::create(&path).unwrap();

    assert!(matches!(store.put(b"", b"v"), Err(StoreError::EmptyKey)));
    assert!(matches!(store.get(b""), Err(StoreError::EmptyKey)));
    assert!(matches!(store.delete(b""), Err(StoreError::EmptyKey)));
    assert_eq!(store.len(), 0);
}

/// Property: a truncated tail (a crash mid-append) is tolerated by replay
/// rather than surfaced as an error, and every fully-written record before
/// it is still recovered.
#[test]
fn replay_tolerates_truncated_tail() {
    use std::fs::OpenOptions;
    use std::io::Write;

    let dir = tempdir().unwrap();
    let path = scratch_path(&dir, "t.db");
    {
        let mut store = Store::create(&path).unwrap();
        store.put(b"a", b"1").unwrap();
        store.put(b"bb", b"22").unwrap();
        store.close();
    }

    // Append a few stray bytes that don't form a complete header.
    {
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&[1, 2, 3]).unwrap();
    }

    let mut store = Store::open(&path).unwrap();
    assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(store.get(b"bb").unwrap(), Some(b"22".to_vec()));
}

/// Property: opening a path that does not exist fails instead of creating
/// it implicitly.
#[test]
fn open_missing_file_fails() {
    let dir = tempdir().unwrap();
    let path = scratch_path(&dir, "missing.db");
    assert!(Store::open(&path).is_err());
}

/// Property: the linear-scan reference get agrees with the indexed get
/// across a mixed sequence of puts and deletes.
#[test]
fn linear_scan_get_agrees_with_indexed_get_across_mixed_ops() {
    let dir = tempdir().unwrap();
    let path = scratch_path(&dir, "t.db");
    let mut store = Store::create(&path).unwrap();

    store.put(b"foo", b"1").unwrap();
    store.put(b"bar", b"a").unwrap();
    store.delete(b"foo").unwrap();
    store.put(b"foo", b"2").unwrap();
    store.put(b"baz", b"z").unwrap();
    store.delete(b"bar").unwrap();

    for key in [b"foo".as_slice(), b"bar".as_slice(), b"baz".as_slice(), b"nope".as_slice()] {
        assert_eq!(
            store.get(key).unwrap(),
            store.get_linear_scan(key).unwrap(),
            "mismatch for key {:?}",
            key
        );
    }
}
