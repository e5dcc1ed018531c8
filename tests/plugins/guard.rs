use barnacle::core::db;
use barnacle::core::error::BarnacleError;
use barnacle::core::ledger::{FileLedger, LedgerAnchor};
use barnacle::core::store::RecordStore;
use barnacle::plugins::purge::{PURGE_ALL_CONFIRMATION, delete_all, delete_one};
use barnacle::plugins::roster::{RecordDraft, create_record};
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn setup() -> (tempfile::TempDir, PathBuf) {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path().to_path_buf();
    db::initialize_registry_db(&root).expect("registry init");
    (tmp, root)
}

fn add(root: &PathBuf, ledger: &dyn LedgerAnchor, id: i64) {
    create_record(
        root,
        ledger,
        &RecordDraft {
            id: Some(id),
            name: format!("Employee {}", id),
            role: "Eng".to_string(),
            salary: 50000,
        },
        false,
    )
    .expect("create");
}

#[test]
fn test_delete_one() {
    let (_tmp, root) = setup();
    let ledger = FileLedger::new(&root, false);
    add(&root, &ledger, 1);

    delete_one(&root, 1).unwrap();
    let store = RecordStore::new(&root);
    assert_eq!(store.count().unwrap(), 0);

    let err = delete_one(&root, 1).unwrap_err();
    assert!(matches!(err, BarnacleError::NotFound(_)));

    let events = fs::read_to_string(root.join("roster.events.jsonl")).unwrap();
    assert!(events.contains("roster.delete"));
}

#[test]
fn test_delete_all_rejects_inexact_confirmations() {
    let (_tmp, root) = setup();
    let ledger = FileLedger::new(&root, false);
    add(&root, &ledger, 1);
    add(&root, &ledger, 2);

    let rejected = [
        "",
        "delete all employee records",
        "DELETE ALL EMPLOYEE",
        "DELETE ALL EMPLOYEE RECORDS ",
        " DELETE ALL EMPLOYEE RECORDS",
        "Delete All Employee Records",
        "yes",
    ];
    for attempt in rejected {
        let err = delete_all(&root, attempt).unwrap_err();
        assert!(
            matches!(err, BarnacleError::PreconditionError(_)),
            "confirmation '{}' should have been rejected",
            attempt
        );
    }

    // Nothing was deleted by the failed attempts.
    let store = RecordStore::new(&root);
    assert_eq!(store.count().unwrap(), 2);
}

#[test]
fn test_delete_all_with_exact_phrase_wipes_and_resets() {
    let (_tmp, root) = setup();
    let ledger = FileLedger::new(&root, false);
    add(&root, &ledger, 1);
    add(&root, &ledger, 2);
    add(&root, &ledger, 3);

    let deleted = delete_all(&root, PURGE_ALL_CONFIRMATION).unwrap();
    assert_eq!(deleted, 3);

    let store = RecordStore::new(&root);
    assert_eq!(store.count().unwrap(), 0);
    // Id assignment starts over after a full wipe.
    assert_eq!(store.next_id().unwrap(), 1);

    let events = fs::read_to_string(root.join("roster.events.jsonl")).unwrap();
    assert!(events.contains("roster.purge"));
}

#[test]
fn test_destruction_never_touches_the_ledger_chain() {
    let (_tmp, root) = setup();
    let ledger = FileLedger::new(&root, false);
    add(&root, &ledger, 1);
    add(&root, &ledger, 2);

    let chain_before = ledger.transactions().unwrap();
    assert_eq!(chain_before.len(), 2);

    delete_one(&root, 1).unwrap();
    delete_all(&root, PURGE_ALL_CONFIRMATION).unwrap();

    // Anchored hashes of deleted records stay discoverable forever.
    let chain_after = ledger.transactions().unwrap();
    assert_eq!(chain_after.len(), 2);
    assert!(chain_after.iter().any(|tx| tx.record_id == 1));
    assert!(chain_after.iter().any(|tx| tx.record_id == 2));

    // Lookups still resolve for ghosts of deleted records.
    assert!(ledger.lookup(1).unwrap().as_anchored().is_some());
}
