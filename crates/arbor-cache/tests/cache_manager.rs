//! Behavioral tests for the namespaced cache manager: on-disk layout,
//! eviction order, corruption recovery, and handle deduplication.

use std::sync::Arc;

use arbor_cache::{CacheStore, Scope};

fn sha256_hex(name: &str) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(name.as_bytes()))
}

#[test]
fn blob_round_trip_is_byte_exact() {
    let dir = tempfile::tempdir().unwrap();
    let store = CacheStore::new(dir.path());
    let manager = store.manager("data", Scope::User).unwrap();

    let payload: Vec<u8> = (0..=255).cycle().take(4096).collect();
    let item = manager.item("some key").unwrap();
    item.set_blob("body", payload.clone()).unwrap();
    item.set_expiry_interval(3600).unwrap();

    assert!(!item.expired());
    assert_eq!(item.get_blob("body").unwrap().unwrap(), payload);
}

#[test]
fn zero_expiry_interval_is_always_expired() {
    let dir = tempfile::tempdir().unwrap();
    let store = CacheStore::new(dir.path());
    let manager = store.manager("data", Scope::User).unwrap();

    let item = manager.item("volatile").unwrap();
    item.set_blob("body", b"data".to_vec()).unwrap();
    item.set_expiry_interval(0).unwrap();
    assert!(item.expired());
}

#[test]
fn on_disk_layout_matches_the_contract() {
    let dir = tempfile::tempdir().unwrap();
    let store = CacheStore::new(dir.path());
    let manager = store.manager("http", Scope::System).unwrap();

    let item = manager.item("https://example.com/a").unwrap();
    item.set_blob("body", b"hello".to_vec()).unwrap();
    item.set_attr("status", 200).unwrap();

    let namespace = dir.path().join("http.system");
    let hash = sha256_hex("https://example.com/a");
    let shard = namespace.join(&hash[..2]);

    assert!(shard.join(format!("{}.body", &hash[2..])).is_file());
    let attrs_path = shard.join(format!("{}_attributes", &hash[2..]));
    assert!(attrs_path.is_file());

    // Attributes file keys.
    let attrs: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&attrs_path).unwrap()).unwrap();
    for key in [
        "accessed_at",
        "modified_at",
        "expiry_interval",
        "attributes",
        "item_sizes",
    ] {
        assert!(attrs.get(key).is_some(), "missing key {key}");
    }
    assert_eq!(attrs["item_sizes"]["body"], 5);
    assert_eq!(attrs["attributes"]["status"], 200);

    // Index maps item-name -> [last_access_epoch, total_size].
    let info: serde_json::Value =
        serde_json::from_slice(&std::fs::read(namespace.join("CacheInfo")).unwrap()).unwrap();
    let entry = &info["https://example.com/a"];
    assert!(entry[0].as_i64().is_some());
    assert_eq!(entry[1], 5);
}

#[test]
fn trim_evicts_in_ascending_access_order() {
    // Items A(access=1, size=10), B(access=2, size=10), C(access=3, size=10);
    // trim(max_bytes=15, max_items=10) evicts A then B, leaving only C.
    let dir = tempfile::tempdir().unwrap();
    let namespace = dir.path().join("data.user");
    std::fs::create_dir_all(&namespace).unwrap();
    std::fs::write(
        namespace.join("CacheInfo"),
        serde_json::json!({"A": [1, 10], "B": [2, 10], "C": [3, 10]}).to_string(),
    )
    .unwrap();

    let store = CacheStore::new(dir.path());
    let manager = store.manager("data", Scope::User).unwrap();
    assert_eq!(manager.item_count(), 3);

    manager.trim(15, 10).unwrap();

    assert_eq!(manager.item_count(), 1);
    assert_eq!(manager.total_size(), 10);
    let info: serde_json::Value =
        serde_json::from_slice(&std::fs::read(namespace.join("CacheInfo")).unwrap()).unwrap();
    assert!(info.get("C").is_some());
    assert!(info.get("A").is_none());
    assert!(info.get("B").is_none());
}

#[test]
fn trim_enforces_the_item_count_bound_first() {
    let dir = tempfile::tempdir().unwrap();
    let namespace = dir.path().join("data.user");
    std::fs::create_dir_all(&namespace).unwrap();
    std::fs::write(
        namespace.join("CacheInfo"),
        serde_json::json!({"old": [1, 1], "mid": [2, 1], "new": [3, 1]}).to_string(),
    )
    .unwrap();

    let store = CacheStore::new(dir.path());
    let manager = store.manager("data", Scope::User).unwrap();
    manager.trim(u64::MAX, 1).unwrap();

    assert_eq!(manager.item_count(), 1);
    let info: serde_json::Value =
        serde_json::from_slice(&std::fs::read(namespace.join("CacheInfo")).unwrap()).unwrap();
    assert!(info.get("new").is_some());
}

#[test]
fn trim_removes_every_file_of_an_evicted_item() {
    let dir = tempfile::tempdir().unwrap();
    let store = CacheStore::new(dir.path());
    let manager = store.manager("data", Scope::User).unwrap();

    let item = manager.item("doomed").unwrap();
    item.set_blob("body", vec![0u8; 100]).unwrap();
    item.set_blob("meta", vec![0u8; 50]).unwrap();
    drop(item);

    manager.trim(0, 0).unwrap();
    assert_eq!(manager.item_count(), 0);

    let hash = sha256_hex("doomed");
    let shard = dir.path().join("data.user").join(&hash[..2]);
    assert!(!shard.join(format!("{}.body", &hash[2..])).exists());
    assert!(!shard.join(format!("{}.meta", &hash[2..])).exists());
    assert!(!shard.join(format!("{}_attributes", &hash[2..])).exists());
}

#[test]
fn corrupt_index_resets_the_namespace() {
    let dir = tempfile::tempdir().unwrap();
    let namespace = dir.path().join("data.user");
    std::fs::create_dir_all(namespace.join("ab")).unwrap();
    std::fs::write(namespace.join("CacheInfo"), b"{not json").unwrap();
    std::fs::write(namespace.join("ab").join("stray"), b"x").unwrap();

    let store = CacheStore::new(dir.path());
    let manager = store.manager("data", Scope::User).unwrap();
    assert_eq!(manager.item_count(), 0);
    assert!(!namespace.join("ab").exists());
}

#[test]
fn missing_index_over_a_nonempty_directory_resets() {
    let dir = tempfile::tempdir().unwrap();
    let namespace = dir.path().join("data.user");
    std::fs::create_dir_all(&namespace).unwrap();
    std::fs::write(namespace.join("orphan"), b"x").unwrap();

    let store = CacheStore::new(dir.path());
    let manager = store.manager("data", Scope::User).unwrap();
    assert_eq!(manager.item_count(), 0);
    assert!(!namespace.join("orphan").exists());
}

#[test]
fn corrupt_attributes_file_yields_fresh_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let store = CacheStore::new(dir.path());
    let manager = store.manager("data", Scope::User).unwrap();

    let item = manager.item("wounded").unwrap();
    item.set_attr("count", 3).unwrap();
    drop(item);

    // Sever the in-memory handle so the next lookup re-reads disk, then
    // corrupt the attributes file behind the manager's back.
    let hash = sha256_hex("wounded");
    let attrs_path = dir
        .path()
        .join("data.user")
        .join(&hash[..2])
        .join(format!("{}_attributes", &hash[2..]));
    std::fs::write(&attrs_path, b"garbage").unwrap();

    let item = manager.item("wounded").unwrap();
    assert_eq!(item.get_attr("count").unwrap(), None);
}

#[test]
fn concurrent_lookups_share_one_handle() {
    let dir = tempfile::tempdir().unwrap();
    let store = CacheStore::new(dir.path());
    let manager = store.manager("data", Scope::User).unwrap();

    let a = manager.item("shared").unwrap();
    let b = manager.item("shared").unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    // Dropping every handle releases the item; the manager does not pin it.
    drop(a);
    drop(b);
    let c = manager.item("shared").unwrap();
    assert_eq!(Arc::strong_count(&c), 1);
}

#[test]
fn concurrent_attribute_updates_agree_after_both_complete() {
    let dir = tempfile::tempdir().unwrap();
    let store = CacheStore::new(dir.path());
    let manager = store.manager("data", Scope::User).unwrap();

    let mut handles = Vec::new();
    for worker in 0..4 {
        let manager = Arc::clone(&manager);
        handles.push(std::thread::spawn(move || {
            for round in 0..25 {
                let item = manager.item("contended").unwrap();
                item.set_attr(&format!("w{worker}"), round).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let item = manager.item("contended").unwrap();
    for worker in 0..4 {
        assert_eq!(
            item.get_attr(&format!("w{worker}")).unwrap(),
            Some(serde_json::json!(24))
        );
    }
}

#[test]
fn clear_recreates_an_empty_namespace() {
    let dir = tempfile::tempdir().unwrap();
    let store = CacheStore::new(dir.path());
    let manager = store.manager("data", Scope::User).unwrap();

    let item = manager.item("x").unwrap();
    item.set_blob("body", b"data".to_vec()).unwrap();
    drop(item);

    manager.clear().unwrap();
    assert_eq!(manager.item_count(), 0);
    assert!(manager.path().is_dir());
}
