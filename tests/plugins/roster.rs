use barnacle::core::db;
use barnacle::core::error::{BarnacleError, ConflictKind};
use barnacle::core::ledger::FileLedger;
use barnacle::core::record::is_well_formed_hash;
use barnacle::core::store::{RecordFilter, RecordStore};
use barnacle::plugins::anchor;
use barnacle::plugins::roster::{
    RecordDraft, check_duplicate, create_record, get_record, list_records,
};
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn setup() -> (tempfile::TempDir, PathBuf) {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path().to_path_buf();
    db::initialize_registry_db(&root).expect("registry init");
    (tmp, root)
}

fn draft(id: Option<i64>, name: &str, salary: i64) -> RecordDraft {
    RecordDraft {
        id,
        name: name.to_string(),
        role: "Eng".to_string(),
        salary,
    }
}

#[test]
fn test_create_lifecycle_with_immediate_anchor() {
    let (_tmp, root) = setup();
    let ledger = FileLedger::new(&root, false);

    let created = create_record(&root, &ledger, &draft(Some(1), "Ana", 80000), false).unwrap();
    assert_eq!(created.id, 1);
    assert!(is_well_formed_hash(&created.stored_hash));
    // Immediate anchoring: ledger hash equals the stored hash.
    assert_eq!(created.ledger_hash.as_deref(), Some(created.stored_hash.as_str()));

    let fetched = get_record(&root, 1).unwrap();
    assert_eq!(fetched, created);

    // Lifecycle event recorded.
    let events = fs::read_to_string(root.join("roster.events.jsonl")).unwrap();
    assert!(events.contains("roster.add"));

    let err = get_record(&root, 2).unwrap_err();
    assert!(matches!(err, BarnacleError::NotFound(_)));
}

#[test]
fn test_id_collision_is_never_overridable() {
    let (_tmp, root) = setup();
    let ledger = FileLedger::new(&root, false);
    create_record(&root, &ledger, &draft(Some(1), "Ana", 80000), false).unwrap();

    let err = create_record(&root, &ledger, &draft(Some(1), "Someone Else", 10), false).unwrap_err();
    assert!(matches!(
        err,
        BarnacleError::Conflict(ConflictKind::IdCollision(1))
    ));

    // force_duplicate only bypasses name collisions, never id collisions.
    let err = create_record(&root, &ledger, &draft(Some(1), "Someone Else", 10), true).unwrap_err();
    assert!(matches!(
        err,
        BarnacleError::Conflict(ConflictKind::IdCollision(1))
    ));
}

#[test]
fn test_name_collision_surfaces_conflicts_and_force_overrides() {
    let (_tmp, root) = setup();
    let ledger = FileLedger::new(&root, false);
    create_record(&root, &ledger, &draft(Some(1), "Ana", 80000), false).unwrap();
    create_record(&root, &ledger, &draft(Some(2), "ANA", 70000), true).unwrap();

    let err = create_record(&root, &ledger, &draft(Some(3), "ana", 60000), false).unwrap_err();
    match err {
        BarnacleError::Conflict(ConflictKind::NameCollision { name, conflicts }) => {
            assert_eq!(name, "ana");
            // Every record sharing the name, case-insensitively.
            let ids: Vec<i64> = conflicts.iter().map(|c| c.id).collect();
            assert_eq!(ids, vec![1, 2]);
        }
        other => panic!("expected NameCollision, got {:?}", other),
    }

    // Retrying with the override proceeds.
    let created = create_record(&root, &ledger, &draft(Some(3), "ana", 60000), true).unwrap();
    assert_eq!(created.id, 3);
}

#[test]
fn test_check_duplicate_is_case_insensitive() {
    let (_tmp, root) = setup();
    let ledger = FileLedger::new(&root, false);
    create_record(&root, &ledger, &draft(Some(1), "Ana Silva", 80000), false).unwrap();

    let set = check_duplicate(&root, "ANA SILVA").unwrap();
    assert!(set.exists);
    assert_eq!(set.conflicts.len(), 1);
    assert_eq!(set.conflicts[0].id, 1);

    let clean = check_duplicate(&root, "Nobody").unwrap();
    assert!(!clean.exists);
    assert!(clean.conflicts.is_empty());
}

#[test]
fn test_validation_errors_reject_malformed_drafts() {
    let (_tmp, root) = setup();
    let ledger = FileLedger::new(&root, false);

    let err = create_record(&root, &ledger, &draft(Some(-1), "Ana", 1), false).unwrap_err();
    assert!(matches!(err, BarnacleError::ValidationError(_)));

    let err = create_record(&root, &ledger, &draft(Some(1), "", 1), false).unwrap_err();
    assert!(matches!(err, BarnacleError::ValidationError(_)));

    let err = create_record(&root, &ledger, &draft(Some(1), "Ana", -5), false).unwrap_err();
    assert!(matches!(err, BarnacleError::ValidationError(_)));
}

#[test]
fn test_omitted_id_takes_next_free_id() {
    let (_tmp, root) = setup();
    let ledger = FileLedger::new(&root, false);
    create_record(&root, &ledger, &draft(Some(4), "Ana", 100), false).unwrap();

    let created = create_record(&root, &ledger, &draft(None, "Bea", 100), false).unwrap();
    assert_eq!(created.id, 5);
}

#[test]
fn test_deferred_anchor_completes_via_sync() {
    let (_tmp, root) = setup();
    let deferred = FileLedger::new(&root, true);

    let created = create_record(&root, &deferred, &draft(Some(1), "Ana", 80000), false).unwrap();
    assert_eq!(created.ledger_hash, None);
    assert!(deferred.transactions().unwrap().is_empty());

    let anchored = anchor::sync_pending(&root, &deferred).unwrap();
    assert_eq!(anchored, 1);

    let fetched = get_record(&root, 1).unwrap();
    assert_eq!(fetched.ledger_hash.as_deref(), Some(created.stored_hash.as_str()));
    assert_eq!(deferred.transactions().unwrap().len(), 1);

    // Nothing left to sync.
    assert_eq!(anchor::sync_pending(&root, &deferred).unwrap(), 0);
}

#[test]
fn test_list_records_applies_filters() {
    let (_tmp, root) = setup();
    let ledger = FileLedger::new(&root, false);
    create_record(&root, &ledger, &draft(Some(1), "Ana", 80000), false).unwrap();
    create_record(&root, &ledger, &draft(Some(2), "Bob", 55000), false).unwrap();

    let all = list_records(&root, &RecordFilter::default()).unwrap();
    assert_eq!(all.len(), 2);

    let filtered = list_records(
        &root,
        &RecordFilter {
            name: Some("bo".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, 2);

    // The store remains queryable through its own interface too.
    let store = RecordStore::new(&root);
    assert_eq!(store.count().unwrap(), 2);
}
