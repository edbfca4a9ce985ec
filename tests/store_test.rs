//! Sample store, bookmark store and eviction behaviour of `DbStore`

use signalspool::codec::{Bookmark, Label, MetricSample, Record};
use signalspool::db::keys::encode_auto_key;
use signalspool::store::DbStore;
use std::thread::sleep;
use std::time::Duration;
use tempfile::TempDir;

fn metric(value: f64) -> Record {
    Record::Metric(MetricSample {
        labels: vec![Label::new("__name__", "cpu_seconds_total"), Label::new("cpu", "0")],
        timestamp_ms: 1_700_000_000_000,
        value,
    })
}

#[test]
fn test_autokeys_strictly_increase() {
    let temp_dir = TempDir::new().unwrap();
    let store = DbStore::open(temp_dir.path(), Duration::from_secs(3600)).unwrap();

    let keys: Vec<u64> = (0..50).map(|i| store.write_signal(&metric(i as f64)).unwrap()).collect();

    assert!(keys.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(store.oldest_key(), Some(keys[0]));
}

#[test]
fn test_consumer_walk_from_bookmark() {
    let temp_dir = TempDir::new().unwrap();
    let store = DbStore::open(temp_dir.path(), Duration::from_secs(3600)).unwrap();

    let keys: Vec<u64> = (0..5).map(|i| store.write_signal(&metric(i as f64)).unwrap()).collect();

    let (bookmark, found) = store.get_bookmark("remote-write");
    assert!(!found);
    assert_eq!(bookmark.key, 1);

    // Process the first three, then checkpoint.
    let mut cursor = store.oldest_key().unwrap();
    for _ in 0..3 {
        assert!(store.get_signal(cursor).is_some());
        cursor = store.next_key(cursor).unwrap();
    }
    store.write_bookmark("remote-write", &Bookmark::at(cursor)).unwrap();

    let (bookmark, found) = store.get_bookmark("remote-write");
    assert!(found);
    assert_eq!(bookmark.key, keys[3]);
    assert_eq!(store.next_key(keys[4]), None);
}

#[test]
fn test_state_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();

    let last = {
        let store = DbStore::open(temp_dir.path(), Duration::from_secs(3600)).unwrap();
        store.write_signal(&metric(1.0)).unwrap();
        let last = store.write_signal(&metric(2.0)).unwrap();
        store.write_bookmark("c", &Bookmark::at(last)).unwrap();
        store.persist().unwrap();
        last
    };

    let store = DbStore::open(temp_dir.path(), Duration::from_secs(3600)).unwrap();
    assert_eq!(store.get_bookmark("c"), (Bookmark::at(last), true));
    assert_eq!(store.get_signal(last), Some(metric(2.0)));
    assert!(store.write_signal(&metric(3.0)).unwrap() > last);
}

#[test]
fn test_eviction_bound() {
    let temp_dir = TempDir::new().unwrap();
    let store = DbStore::open(temp_dir.path(), Duration::from_millis(200)).unwrap();

    let old: Vec<u64> = (0..3).map(|i| store.write_signal(&metric(i as f64)).unwrap()).collect();
    sleep(Duration::from_millis(300));
    let fresh = store.write_signal(&metric(9.0)).unwrap();

    let stats = store.evict();
    assert_eq!(stats.samples_evicted, 3);

    for key in old {
        assert_eq!(store.get_signal(key), None);
    }
    assert_eq!(store.get_signal(fresh), Some(metric(9.0)));
    assert_eq!(store.oldest_key(), Some(fresh));
}

#[test]
fn test_bookmarks_not_evicted_by_sample_ttl() {
    let temp_dir = TempDir::new().unwrap();
    let store = DbStore::open(temp_dir.path(), Duration::from_millis(1)).unwrap();

    store.write_bookmark("c", &Bookmark::at(5)).unwrap();
    sleep(Duration::from_millis(20));

    let stats = store.evict();
    assert_eq!(stats.bookmarks_evicted, 0);
    assert_eq!(store.get_bookmark("c"), (Bookmark::at(5), true));
}

#[test]
fn test_ttl_wins_over_in_use_watermark() {
    let temp_dir = TempDir::new().unwrap();
    let store = DbStore::open(temp_dir.path(), Duration::from_millis(1)).unwrap();

    let key = store.write_signal(&metric(1.0)).unwrap();
    store.update_oldest_key(key);
    sleep(Duration::from_millis(20));

    // The watermark is tracked but eviction is age-only: unconsumed data
    // past its TTL is still reclaimed.
    store.evict();
    assert_eq!(store.oldest_in_use_key(), key);
    assert_eq!(store.get_signal(key), None);
}

#[test]
fn test_non_bookmark_under_bookmark_key_reads_as_default() {
    let temp_dir = TempDir::new().unwrap();
    let store = DbStore::open(temp_dir.path(), Duration::from_secs(60)).unwrap();

    store.write_bookmark("c", &Bookmark::at(3)).unwrap();
    drop(store);

    let bookmark_db =
        signalspool::SignalDb::open(temp_dir.path().join("bookmark"), Duration::ZERO).unwrap();
    bookmark_db
        .write_value(b"c", &metric(1.0), Duration::ZERO)
        .unwrap();
    drop(bookmark_db);

    let store = DbStore::open(temp_dir.path(), Duration::from_secs(60)).unwrap();
    assert_eq!(store.get_bookmark("c"), (Bookmark::at(1), false));
}

#[test]
fn test_unreadable_signal_reads_as_missing() {
    let temp_dir = TempDir::new().unwrap();
    let store = DbStore::open(temp_dir.path(), Duration::from_secs(60)).unwrap();
    let key = store.write_signal(&metric(1.0)).unwrap();
    drop(store);

    let sample_db =
        signalspool::SignalDb::open(temp_dir.path().join("sample"), Duration::ZERO).unwrap();
    sample_db
        .put(&encode_auto_key(key), &[42, 1], Duration::ZERO)
        .unwrap();
    assert!(sample_db.get_by_key(key).is_err());
    drop(sample_db);

    let store = DbStore::open(temp_dir.path(), Duration::from_secs(60)).unwrap();
    assert_eq!(store.get_signal(key), None);
    assert_eq!(store.oldest_key(), Some(key));
}
