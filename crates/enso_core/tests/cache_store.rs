//! Cache persistence, self-healing and the pending-change log.

use chrono::{TimeZone, Utc};

use enso_core::cache::sqlite_store::SqliteKeyValueStore;
use enso_core::cache::store::{KeyValueStore, MemoryKeyValueStore};
use enso_core::cache::thought_cache::{
    PendingChangeKind, ThoughtCache, CLIENT_ID_KEY, CURSOR_KEY, PENDING_KEY, THOUGHTS_KEY,
};
use enso_core::db::open_db;
use enso_core::model::thought::Thought;
use enso_core::runtime::{IdGenerator, UuidIdGenerator};

fn thought(id: &str, second: u32) -> Thought {
    Thought {
        id: id.to_string(),
        title: "Cached".to_string(),
        content: "body".to_string(),
        tags: vec!["focus".to_string()],
        links: Vec::new(),
        created_at: Utc.with_ymd_and_hms(2025, 9, 27, 7, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2025, 9, 27, 7, 0, second).unwrap(),
    }
}

#[test]
fn thoughts_round_trip_and_upsert_inserts_new_records_first() {
    let mut cache = ThoughtCache::new(MemoryKeyValueStore::new());
    assert!(cache.read_thoughts().expect("read should work").is_empty());

    cache
        .upsert_thought(&thought("th_a", 1))
        .expect("upsert should work");
    cache
        .upsert_thought(&thought("th_b", 2))
        .expect("upsert should work");

    let listed = cache.read_thoughts().expect("read should work");
    assert_eq!(listed[0].id, "th_b");
    assert_eq!(listed[1].id, "th_a");

    let mut replacement = thought("th_a", 3);
    replacement.content = "replaced".to_string();
    cache
        .upsert_thought(&replacement)
        .expect("upsert should work");

    let listed = cache.read_thoughts().expect("read should work");
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[1].content, "replaced");
}

#[test]
fn corrupt_payload_reads_as_empty_and_heals_on_next_write() {
    let mut store = MemoryKeyValueStore::new();
    store
        .write(THOUGHTS_KEY, "{definitely not json")
        .expect("write should work");
    let mut cache = ThoughtCache::new(store);

    assert!(cache.read_thoughts().expect("read should work").is_empty());

    cache
        .write_thoughts(&[thought("th_a", 1)])
        .expect("write should work");
    assert_eq!(cache.read_thoughts().expect("read should work").len(), 1);
}

#[test]
fn one_bad_entry_is_skipped_without_losing_the_rest() {
    let good = serde_json::to_value(thought("th_good", 1)).expect("encode should work");
    let raw = serde_json::json!([good, {"bogus": true}]).to_string();

    let mut store = MemoryKeyValueStore::new();
    store.write(THOUGHTS_KEY, &raw).expect("write should work");
    let cache = ThoughtCache::new(store);

    let listed = cache.read_thoughts().expect("read should work");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "th_good");
}

#[test]
fn removing_a_thought_returns_its_snapshot_and_strips_links() {
    let mut cache = ThoughtCache::new(MemoryKeyValueStore::new());
    let mut keeper = thought("th_keeper", 1);
    keeper.links.push("th_gone".to_string());
    cache.upsert_thought(&keeper).expect("upsert should work");
    cache
        .upsert_thought(&thought("th_gone", 2))
        .expect("upsert should work");

    let snapshot = cache
        .remove_thought("th_gone")
        .expect("remove should work")
        .expect("snapshot should exist");
    assert_eq!(snapshot.id, "th_gone");

    let listed = cache.read_thoughts().expect("read should work");
    assert_eq!(listed.len(), 1);
    assert!(listed[0].links.is_empty());

    assert_eq!(
        cache
            .remove_thought("th_gone")
            .expect("repeat remove should work"),
        None
    );
}

#[test]
fn cursor_clears_via_none_and_heals_from_garbage() {
    let mut cache = ThoughtCache::new(MemoryKeyValueStore::new());
    assert_eq!(cache.read_cursor().expect("read should work"), None);

    cache
        .write_cursor(Some("cursor-42"))
        .expect("write should work");
    assert_eq!(
        cache.read_cursor().expect("read should work"),
        Some("cursor-42".to_string())
    );

    cache.write_cursor(None).expect("clear should work");
    assert_eq!(cache.read_cursor().expect("read should work"), None);

    let mut store = MemoryKeyValueStore::new();
    store
        .write(CURSOR_KEY, "not-a-json-string")
        .expect("write should work");
    let cache = ThoughtCache::new(store);
    assert_eq!(cache.read_cursor().expect("read should work"), None);
}

#[test]
fn pending_log_appends_in_order_and_clears_atomically() {
    let mut cache = ThoughtCache::new(MemoryKeyValueStore::new());

    cache
        .append_pending(PendingChangeKind::Upsert, &thought("th_a", 1))
        .expect("append should work");
    let log = cache
        .append_pending(PendingChangeKind::Delete, &thought("th_b", 2))
        .expect("append should work");

    assert_eq!(log.len(), 2);
    assert_eq!(log[0].kind, PendingChangeKind::Upsert);
    assert_eq!(log[1].kind, PendingChangeKind::Delete);
    assert_eq!(
        cache.read_pending().expect("read should work").len(),
        2
    );

    cache.clear_pending().expect("clear should work");
    assert!(cache.read_pending().expect("read should work").is_empty());
}

#[test]
fn broken_pending_entries_are_skipped_on_read() {
    let good = serde_json::to_value(enso_core::cache::thought_cache::PendingChange {
        kind: PendingChangeKind::Upsert,
        thought: thought("th_good", 1),
    })
    .expect("encode should work");
    let raw = serde_json::json!([good, {"kind": "upsert"}]).to_string();

    let mut store = MemoryKeyValueStore::new();
    store.write(PENDING_KEY, &raw).expect("write should work");
    let cache = ThoughtCache::new(store);

    let pending = cache.read_pending().expect("read should work");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].thought.id, "th_good");
}

#[test]
fn client_id_is_minted_once_and_reused() {
    let mut cache = ThoughtCache::new(MemoryKeyValueStore::new());
    let ids = UuidIdGenerator;

    let first = cache.client_id(&ids).expect("client id should mint");
    let second = cache.client_id(&ids).expect("client id should read back");
    assert_eq!(first, second);
    assert!(first.starts_with("enso-"));

    // A pre-seeded raw value is honored as-is.
    let mut store = MemoryKeyValueStore::new();
    store
        .write(CLIENT_ID_KEY, "enso-pinned")
        .expect("write should work");
    let mut cache = ThoughtCache::new(store);
    assert_eq!(
        cache.client_id(&ids).expect("client id should read"),
        "enso-pinned"
    );
}

#[test]
fn sqlite_backed_cache_persists_across_reopen() {
    let dir = tempfile::tempdir().expect("tempdir should create");
    let path = dir.path().join("enso-cache.sqlite3");

    {
        let conn = open_db(&path).expect("db should open");
        let store = SqliteKeyValueStore::try_new(&conn).expect("schema should exist");
        let mut cache = ThoughtCache::new(store);
        cache
            .upsert_thought(&thought("th_persisted", 1))
            .expect("upsert should work");
        cache
            .write_cursor(Some("cursor-7"))
            .expect("cursor should write");
    }

    let conn = open_db(&path).expect("db should reopen");
    let store = SqliteKeyValueStore::try_new(&conn).expect("schema should exist");
    let cache = ThoughtCache::new(store);

    let listed = cache.read_thoughts().expect("read should work");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "th_persisted");
    assert_eq!(
        cache.read_cursor().expect("read should work"),
        Some("cursor-7".to_string())
    );
}

#[test]
fn mint_uses_id_generator_trait_object() {
    struct PinnedIds;

    impl IdGenerator for PinnedIds {
        fn thought_id(&self) -> String {
            "th_pinned".to_string()
        }

        fn client_id(&self) -> String {
            "enso-from-generator".to_string()
        }
    }

    let mut cache = ThoughtCache::new(MemoryKeyValueStore::new());
    assert_eq!(
        cache.client_id(&PinnedIds).expect("client id should mint"),
        "enso-from-generator"
    );
}
