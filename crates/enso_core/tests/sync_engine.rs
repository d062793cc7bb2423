//! Sync engine exchange semantics: merge, retries and failure isolation.

use chrono::{DateTime, TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use enso_core::cache::store::MemoryKeyValueStore;
use enso_core::cache::thought_cache::{PendingChange, PendingChangeKind, ThoughtCache};
use enso_core::model::thought::Thought;
use enso_core::sync::engine::{SyncEngine, SyncError, SyncState};
use enso_core::sync::protocol::{SyncRequestBody, SyncResponseBody, SyncThoughtPayload};
use enso_core::sync::transport::{SyncTransport, TransportError, TransportResult};

#[derive(Clone, Default)]
struct ScriptedTransport {
    state: Arc<ScriptState>,
}

#[derive(Default)]
struct ScriptState {
    responses: Mutex<VecDeque<TransportResult<SyncResponseBody>>>,
    requests: Mutex<Vec<SyncRequestBody>>,
}

impl ScriptedTransport {
    fn new() -> Self {
        Self::default()
    }

    fn push_ok(&self, response: SyncResponseBody) {
        self.state
            .responses
            .lock()
            .expect("responses lock should not be poisoned")
            .push_back(Ok(response));
    }

    fn push_err(&self, err: TransportError) {
        self.state
            .responses
            .lock()
            .expect("responses lock should not be poisoned")
            .push_back(Err(err));
    }

    fn requests(&self) -> Vec<SyncRequestBody> {
        self.state
            .requests
            .lock()
            .expect("requests lock should not be poisoned")
            .clone()
    }
}

impl SyncTransport for ScriptedTransport {
    fn exchange(&self, request: &SyncRequestBody) -> TransportResult<SyncResponseBody> {
        self.state
            .requests
            .lock()
            .expect("requests lock should not be poisoned")
            .push(request.clone());
        self.state
            .responses
            .lock()
            .expect("responses lock should not be poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("script exhausted".to_string())))
    }
}

fn at(second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 27, 7, 0, second).unwrap()
}

fn thought(id: &str, second: u32, content: &str) -> Thought {
    Thought {
        id: id.to_string(),
        title: "Synced".to_string(),
        content: content.to_string(),
        tags: Vec::new(),
        links: Vec::new(),
        created_at: at(0),
        updated_at: at(second),
    }
}

fn upsert_payload(thought: &Thought) -> SyncThoughtPayload {
    SyncThoughtPayload::from_pending(&PendingChange {
        kind: PendingChangeKind::Upsert,
        thought: thought.clone(),
    })
}

fn tombstone_payload(thought: &Thought) -> SyncThoughtPayload {
    let mut payload = upsert_payload(thought);
    payload.deleted_at = Some(payload.updated_at.clone());
    payload
}

fn response(cursor: &str, changes: Vec<SyncThoughtPayload>, has_more: bool) -> SyncResponseBody {
    SyncResponseBody {
        cursor: cursor.to_string(),
        changes,
        has_more,
    }
}

#[test]
fn successful_exchange_uploads_pending_and_clears_it() {
    let transport = ScriptedTransport::new();
    transport.push_ok(response("cursor-2", Vec::new(), false));
    let mut engine = SyncEngine::new(transport.clone(), "enso-test");
    assert_eq!(engine.state(), SyncState::Idle);

    let mut cache = ThoughtCache::new(MemoryKeyValueStore::new());
    let local = thought("th_local", 5, "local change");
    cache.upsert_thought(&local).expect("upsert should work");
    cache
        .append_pending(PendingChangeKind::Upsert, &local)
        .expect("append should work");
    cache
        .write_cursor(Some("cursor-1"))
        .expect("cursor should write");

    let report = engine.sync_once(&mut cache).expect("sync should succeed");
    assert_eq!(report.cursor, "cursor-2");
    assert!(!report.has_more);
    assert_eq!(engine.state(), SyncState::Idle);

    assert!(cache.read_pending().expect("read should work").is_empty());
    assert_eq!(
        cache.read_cursor().expect("read should work"),
        Some("cursor-2".to_string())
    );

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].client_id, "enso-test");
    assert_eq!(requests[0].since.as_deref(), Some("cursor-1"));
    assert_eq!(requests[0].changes.len(), 1);
    assert_eq!(requests[0].changes[0].id, "th_local");
    assert_eq!(requests[0].changes[0].deleted_at, None);
}

#[test]
fn missing_cursor_requests_a_full_resync() {
    let transport = ScriptedTransport::new();
    transport.push_ok(response(
        "cursor-1",
        vec![
            upsert_payload(&thought("th_a", 3, "from server")),
            upsert_payload(&thought("th_b", 4, "also from server")),
        ],
        false,
    ));
    let mut engine = SyncEngine::new(transport.clone(), "enso-test");
    let mut cache = ThoughtCache::new(MemoryKeyValueStore::new());

    let report = engine.sync_once(&mut cache).expect("sync should succeed");
    assert_eq!(report.upserted, 2);

    assert_eq!(transport.requests()[0].since, None);
    assert_eq!(cache.read_thoughts().expect("read should work").len(), 2);
}

#[test]
fn merge_is_last_writer_wins_with_ties_to_the_server() {
    let transport = ScriptedTransport::new();
    transport.push_ok(response(
        "cursor-2",
        vec![
            upsert_payload(&thought("th_tie", 5, "server copy")),
            upsert_payload(&thought("th_stale", 2, "older server copy")),
            upsert_payload(&thought("th_new", 6, "brand new")),
        ],
        false,
    ));
    let mut engine = SyncEngine::new(transport, "enso-test");

    let mut cache = ThoughtCache::new(MemoryKeyValueStore::new());
    cache
        .upsert_thought(&thought("th_tie", 5, "local copy"))
        .expect("upsert should work");
    cache
        .upsert_thought(&thought("th_stale", 4, "newer local copy"))
        .expect("upsert should work");

    let report = engine.sync_once(&mut cache).expect("sync should succeed");
    assert_eq!(report.upserted, 2);
    assert_eq!(report.removed, 0);

    let listed = cache.read_thoughts().expect("read should work");
    let by_id = |id: &str| {
        listed
            .iter()
            .find(|thought| thought.id == id)
            .unwrap_or_else(|| panic!("{id} should be cached"))
    };
    assert_eq!(by_id("th_tie").content, "server copy");
    assert_eq!(by_id("th_stale").content, "newer local copy");
    assert_eq!(by_id("th_new").content, "brand new");
}

#[test]
fn tombstones_remove_records_and_their_backlinks() {
    let transport = ScriptedTransport::new();
    transport.push_ok(response(
        "cursor-2",
        vec![tombstone_payload(&thought("th_gone", 8, "deleted remotely"))],
        false,
    ));
    let mut engine = SyncEngine::new(transport, "enso-test");

    let mut cache = ThoughtCache::new(MemoryKeyValueStore::new());
    cache
        .upsert_thought(&thought("th_gone", 5, "old local"))
        .expect("upsert should work");
    let mut keeper = thought("th_keeper", 4, "still here");
    keeper.links.push("th_gone".to_string());
    cache.upsert_thought(&keeper).expect("upsert should work");

    let report = engine.sync_once(&mut cache).expect("sync should succeed");
    assert_eq!(report.removed, 1);

    let listed = cache.read_thoughts().expect("read should work");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "th_keeper");
    assert!(listed[0].links.is_empty());
}

#[test]
fn tombstone_loses_to_a_newer_local_edit() {
    let transport = ScriptedTransport::new();
    transport.push_ok(response(
        "cursor-2",
        vec![tombstone_payload(&thought("th_alive", 5, "deleted remotely"))],
        false,
    ));
    let mut engine = SyncEngine::new(transport, "enso-test");

    let mut cache = ThoughtCache::new(MemoryKeyValueStore::new());
    cache
        .upsert_thought(&thought("th_alive", 6, "local edit wins"))
        .expect("upsert should work");

    let report = engine.sync_once(&mut cache).expect("sync should succeed");
    assert_eq!(report.removed, 0);
    assert_eq!(cache.read_thoughts().expect("read should work").len(), 1);
}

#[test]
fn failed_exchange_leaves_cache_cursor_and_pending_untouched() {
    let transport = ScriptedTransport::new();
    transport.push_err(TransportError::Http {
        status: 500,
        body: "boom".to_string(),
    });
    let mut engine = SyncEngine::new(transport.clone(), "enso-test");

    let mut cache = ThoughtCache::new(MemoryKeyValueStore::new());
    let local = thought("th_local", 5, "local change");
    cache.upsert_thought(&local).expect("upsert should work");
    cache
        .append_pending(PendingChangeKind::Upsert, &local)
        .expect("append should work");
    cache
        .write_cursor(Some("cursor-1"))
        .expect("cursor should write");

    let err = engine.sync_once(&mut cache).expect_err("sync must fail");
    assert!(matches!(err, SyncError::Transport(_)));
    assert_eq!(engine.state(), SyncState::Conflict);

    assert_eq!(cache.read_pending().expect("read should work").len(), 1);
    assert_eq!(
        cache.read_cursor().expect("read should work"),
        Some("cursor-1".to_string())
    );
    assert_eq!(cache.read_thoughts().expect("read should work").len(), 1);

    // The retry resends exactly the same request.
    transport.push_ok(response("cursor-2", Vec::new(), false));
    engine.sync_once(&mut cache).expect("retry should succeed");
    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0], requests[1]);
    assert_eq!(engine.state(), SyncState::Idle);
}

#[test]
fn one_invalid_incoming_payload_rejects_the_whole_batch() {
    let mut broken = upsert_payload(&thought("th_bad", 5, "bad stamp"));
    broken.updated_at = "not-a-timestamp".to_string();

    let transport = ScriptedTransport::new();
    transport.push_ok(response(
        "cursor-2",
        vec![upsert_payload(&thought("th_ok", 4, "fine")), broken],
        false,
    ));
    let mut engine = SyncEngine::new(transport, "enso-test");
    let mut cache = ThoughtCache::new(MemoryKeyValueStore::new());

    let err = engine.sync_once(&mut cache).expect_err("sync must fail");
    assert!(matches!(err, SyncError::InvalidChange(_)));

    assert!(cache.read_thoughts().expect("read should work").is_empty());
    assert_eq!(cache.read_cursor().expect("read should work"), None);
}

#[test]
fn has_more_is_reported_but_never_auto_followed() {
    let transport = ScriptedTransport::new();
    transport.push_ok(response("cursor-2", Vec::new(), true));
    let mut engine = SyncEngine::new(transport.clone(), "enso-test");
    let mut cache = ThoughtCache::new(MemoryKeyValueStore::new());

    let report = engine.sync_once(&mut cache).expect("sync should succeed");
    assert!(report.has_more);
    assert_eq!(transport.requests().len(), 1);
}
