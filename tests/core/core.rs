use barnacle::core::broker::{BrokerEvent, DbBroker};
use barnacle::core::db;
use barnacle::core::error::{BarnacleError, ConflictKind};
use barnacle::core::ledger::{FileLedger, LedgerAnchor};
use barnacle::core::record::{EmployeeRecord, FieldUpdate, record_hash};
use barnacle::core::store::{RecordFilter, RecordStore};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn setup() -> (tempfile::TempDir, PathBuf) {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path().to_path_buf();
    db::initialize_registry_db(&root).expect("registry init");
    (tmp, root)
}

fn sample_record(id: i64, name: &str, salary: i64) -> EmployeeRecord {
    let created_at = "1700000000Z".to_string();
    let stored_hash = record_hash(id, name, "Eng", salary, &created_at);
    EmployeeRecord {
        id,
        name: name.to_string(),
        role: "Eng".to_string(),
        salary,
        created_at,
        stored_hash,
        ledger_hash: None,
    }
}

fn put(store: &RecordStore, record: &EmployeeRecord) {
    store.put(record).expect("put");
}

#[test]
fn db_and_broker_round_trip_and_audit() {
    let (_tmp, root) = setup();
    let db_path = db::registry_db_path(&root);
    assert!(db_path.exists());

    let conn = db::db_connect(&db_path.to_string_lossy()).expect("db connect");
    let fk_on: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .expect("pragma foreign_keys");
    assert_eq!(fk_on, 1);

    let broker = DbBroker::new(&root);
    broker
        .with_conn(&db_path, "tester", Some("intent-1"), "registry.touch", |conn| {
            conn.execute(
                "INSERT INTO meta(key, value) VALUES('probe', '1')",
                [],
            )
            .map_err(BarnacleError::RusqliteError)?;
            Ok(())
        })
        .expect("broker success path");

    let result: Result<(), BarnacleError> =
        broker.with_conn(&db_path, "tester", None, "registry.fail", |_| {
            Err(BarnacleError::ValidationError("intentional".to_string()))
        });
    assert!(result.is_err());

    let audit_path = root.join("broker.events.jsonl");
    assert!(audit_path.exists());
    let events: Vec<BrokerEvent> = fs::read_to_string(&audit_path)
        .expect("read audit")
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid broker event json"))
        .collect();
    assert!(events.iter().any(|ev| ev.status == "success"));
    assert!(events.iter().any(|ev| ev.status == "error"));
    assert!(events.iter().any(|ev| ev.op == "registry.touch"));
}

#[test]
fn store_crud_round_trip() {
    let (_tmp, root) = setup();
    let store = RecordStore::new(&root);

    assert!(store.get(1).expect("get").is_none());
    put(&store, &sample_record(2, "Bea", 50000));
    put(&store, &sample_record(1, "Ana", 80000));

    let fetched = store.get(1).expect("get").expect("present");
    assert_eq!(fetched.name, "Ana");
    assert_eq!(fetched.salary, 80000);
    assert_eq!(fetched.ledger_hash, None);

    // get_all is ascending-id regardless of insertion order.
    let all = store.get_all().expect("get_all");
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, 1);
    assert_eq!(all[1].id, 2);

    assert!(store.delete(1).expect("delete"));
    assert!(!store.delete(1).expect("delete again"));
    assert_eq!(store.count().expect("count"), 1);
}

#[test]
fn store_put_rejects_duplicate_id() {
    let (_tmp, root) = setup();
    let store = RecordStore::new(&root);
    put(&store, &sample_record(7, "Ana", 80000));

    let err = store.put(&sample_record(7, "Bob", 10)).unwrap_err();
    assert!(matches!(
        err,
        BarnacleError::Conflict(ConflictKind::IdCollision(7))
    ));
}

#[test]
fn store_missing_registry_is_unavailable() {
    let tmp = tempdir().expect("tempdir");
    let store = RecordStore::new(tmp.path());
    let err = store.get_all().unwrap_err();
    assert!(matches!(err, BarnacleError::StoreUnavailable(_)));
}

#[test]
fn store_next_id_tracks_highest_assigned() {
    let (_tmp, root) = setup();
    let store = RecordStore::new(&root);
    assert_eq!(store.next_id().expect("next_id"), 1);

    put(&store, &sample_record(5, "Ana", 100));
    assert_eq!(store.next_id().expect("next_id"), 6);

    // Deleting a record does not recycle ids.
    assert!(store.delete(5).expect("delete"));
    assert_eq!(store.next_id().expect("next_id"), 6);

    // A full wipe resets the counter.
    put(&store, &sample_record(6, "Bea", 100));
    let deleted = store.delete_all().expect("delete_all");
    assert_eq!(deleted, 1);
    assert_eq!(store.next_id().expect("next_id"), 1);
}

#[test]
fn store_search_filters_compose() {
    let (_tmp, root) = setup();
    let store = RecordStore::new(&root);
    put(&store, &sample_record(1, "Ana Silva", 80000));
    put(&store, &sample_record(2, "Bob Mehta", 55000));
    put(&store, &sample_record(3, "ana-maria", 90000));

    let by_name = store
        .search(&RecordFilter {
            name: Some("ANA".to_string()),
            ..Default::default()
        })
        .expect("search");
    assert_eq!(by_name.len(), 2);

    let by_range = store
        .search(&RecordFilter {
            min_salary: Some(60000),
            max_salary: Some(85000),
            ..Default::default()
        })
        .expect("search");
    assert_eq!(by_range.len(), 1);
    assert_eq!(by_range[0].id, 1);

    let combined = store
        .search(&RecordFilter {
            name: Some("ana".to_string()),
            min_salary: Some(85000),
            ..Default::default()
        })
        .expect("search");
    assert_eq!(combined.len(), 1);
    assert_eq!(combined[0].id, 3);
}

#[test]
fn store_unhashed_update_leaves_stored_hash_stale() {
    let (_tmp, root) = setup();
    let store = RecordStore::new(&root);
    let original = sample_record(1, "Ana", 80000);
    put(&store, &original);

    let mutated = store
        .apply_unhashed_update(1, &FieldUpdate::Salary(90000))
        .expect("unhashed update");
    assert_eq!(mutated.salary, 90000);
    assert_eq!(mutated.stored_hash, original.stored_hash);
    assert_ne!(mutated.compute_hash(), mutated.stored_hash);

    let err = store
        .apply_unhashed_update(99, &FieldUpdate::Name("X".to_string()))
        .unwrap_err();
    assert!(matches!(err, BarnacleError::NotFound(_)));
}

#[test]
fn ledger_chain_survives_registry_wipe() {
    let (_tmp, root) = setup();
    let store = RecordStore::new(&root);
    let ledger = FileLedger::new(&root, false);

    let record = sample_record(1, "Ana", 80000);
    put(&store, &record);
    ledger.anchor(1, &record.stored_hash).expect("anchor");

    store.delete_all().expect("wipe");

    let transactions = ledger.transactions().expect("transactions");
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].record_id, 1);
    assert_eq!(transactions[0].record_hash, record.stored_hash);
}

fn chain_file(root: &Path) -> PathBuf {
    root.join("ledger.chain.jsonl")
}

#[test]
fn ledger_lookup_tolerates_missing_chain() {
    let (_tmp, root) = setup();
    let ledger = FileLedger::new(&root, false);
    assert!(!chain_file(&root).exists());
    assert_eq!(
        ledger.lookup(42).expect("lookup"),
        barnacle::core::record::AnchorState::Pending
    );
}
