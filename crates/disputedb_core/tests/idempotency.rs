//! End-to-end idempotency tests over a file-backed store.
//!
//! Each test models a client retrying a request after a lost response:
//! the retry must converge on the same outcome as the original attempt,
//! including across a process restart (simulated by reopening the
//! store).

use std::path::Path;
use std::sync::Arc;

use disputedb_core::{
    CoreError, Engine, EngineConfig, Record, RecordDraft, RecordPayload, RecordStore,
};
use tempfile::tempdir;

fn open_store(path: &Path) -> RecordStore {
    let engine = Arc::new(Engine::open(path).unwrap());
    RecordStore::new(engine).unwrap()
}

fn payload(amount: i64, currency: &str, reason: &str) -> RecordPayload {
    RecordPayload {
        amount,
        currency: currency.into(),
        reason: reason.into(),
    }
}

#[test]
fn retried_create_converges_across_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("disputes.db");

    let original: Record;
    {
        let store = open_store(&path);
        let (record, created) = store
            .create(RecordDraft::new("cb_1001", payload(2500, "USD", "fraudulent")))
            .unwrap();
        assert!(created);
        original = record;
        store.engine().close().unwrap();
    }

    // The client never saw the response and retries after we restarted.
    let store = open_store(&path);
    let (replayed, created) = store
        .create(RecordDraft::new("cb_1001", payload(2500, "USD", "fraudulent")))
        .unwrap();
    assert!(!created);
    assert_eq!(replayed, original);
}

#[test]
fn retried_update_reports_no_write_the_second_time() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("disputes.db");
    let store = open_store(&path);

    store
        .create(RecordDraft::new("cb_1", payload(2500, "USD", "fraudulent")))
        .unwrap();

    let (first, written) = store
        .update("cb_1", payload(3000, "USD", "fraudulent"))
        .unwrap();
    assert!(written);

    // Identical retry: same record back, but no effective write.
    let (second, written) = store
        .update("cb_1", payload(3000, "USD", "fraudulent"))
        .unwrap();
    assert!(!written);
    assert_eq!(second, first);
    assert_eq!(second.updated_at, first.updated_at);
}

#[test]
fn retried_delete_succeeds_across_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("disputes.db");

    {
        let store = open_store(&path);
        store
            .create(RecordDraft::new("cb_1", payload(100, "USD", "duplicate")))
            .unwrap();
        store.delete("cb_1").unwrap();
        store.engine().close().unwrap();
    }

    let store = open_store(&path);
    store.delete("cb_1").unwrap();
    assert!(matches!(store.get("cb_1"), Err(CoreError::NotFound { .. })));
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn records_survive_restart_without_clean_close() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("disputes.db");

    {
        let store = open_store(&path);
        store
            .create(RecordDraft::new("cb_1", payload(2500, "USD", "fraudulent")))
            .unwrap();
        store
            .update("cb_1", payload(3000, "USD", "fraudulent"))
            .unwrap();
        // Engine dropped without an explicit close; the WAL already has
        // every commit.
        drop(store);
    }

    let store = open_store(&path);
    let record = store.get("cb_1").unwrap();
    assert_eq!(record.amount, 3000);
    assert!(record.updated_at > record.created_at);
}

#[test]
fn timestamps_round_trip_exactly_through_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("disputes.db");

    let before: Record;
    {
        let store = open_store(&path);
        let (record, _) = store
            .create(RecordDraft::new("cb_1", payload(1, "USD", "r")))
            .unwrap();
        before = record;
        store.engine().close().unwrap();
    }

    let store = open_store(&path);
    let after = store.get("cb_1").unwrap();
    assert_eq!(after.created_at, before.created_at);
    assert_eq!(after.updated_at, before.updated_at);
}

#[test]
fn mixed_operations_leave_a_consistent_listing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("disputes.db");
    let store = open_store(&path);

    for id in ["cb_a", "cb_b", "cb_c"] {
        store
            .create(RecordDraft::new(id, payload(100, "USD", "initial")))
            .unwrap();
    }
    store.update("cb_b", payload(200, "EUR", "revised")).unwrap();
    store.delete("cb_a").unwrap();
    store.delete("cb_a").unwrap();

    let listed = store.list().unwrap();
    let ids: Vec<&str> = listed.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["cb_b", "cb_c"]);

    let b = listed.iter().find(|r| r.id == "cb_b").unwrap();
    assert_eq!(b.amount, 200);
    assert_eq!(b.currency, "EUR");
}

#[test]
fn compaction_preserves_idempotency_state() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("disputes.db");

    let original: Record;
    {
        let store = open_store(&path);
        let (record, _) = store
            .create(RecordDraft::new("cb_1", payload(2500, "USD", "fraudulent")))
            .unwrap();
        original = record;
        for amount in 0..50 {
            store
                .update("cb_1", payload(amount, "USD", "fraudulent"))
                .unwrap();
        }
        store
            .update("cb_1", payload(2500, "USD", "fraudulent"))
            .unwrap();

        store.engine().compact().unwrap();
        store.engine().close().unwrap();
    }

    let store = open_store(&path);
    // A replayed create still sees the record and still refuses to
    // overwrite it after compaction rewrote the log.
    let (record, created) = store
        .create(RecordDraft::new("cb_1", payload(1, "EUR", "other")))
        .unwrap();
    assert!(!created);
    assert_eq!(record.amount, 2500);
    assert_eq!(record.created_at, original.created_at);
}

#[test]
fn only_one_process_may_hold_the_store() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("disputes.db");

    let held = open_store(&path);
    let config = EngineConfig::default().lock_timeout(std::time::Duration::from_millis(100));
    assert!(matches!(
        Engine::open_with_config(&path, config),
        Err(CoreError::LockTimeout)
    ));

    held.engine().close().unwrap();
    drop(held);
    let _reopened = open_store(&path);
}
