//! Sample-to-full-set reconciliation.
//!
//! A verification run may cover only a sample of the registry. Reconciliation
//! merges that sample into a view spanning every record, so a dashboard can
//! show quick unverified data immediately and refine it batch by batch without
//! the visible record count ever shrinking. The merge is a pure function of
//! (previous view, fresh results, full record set).

use crate::core::record::EmployeeRecord;
use crate::core::triad::{TriadStatus, VerificationResult};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// How an entry's verdict made it into the current view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    /// Verified in the run that produced this view.
    Fresh,
    /// Verdict kept from an earlier run; the record was outside this sample.
    Carried,
    /// Never verified. Not a pass, not a failure: "not yet checked".
    Unchecked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewEntry {
    pub id: i64,
    pub name: String,
    pub role: String,
    pub salary: i64,
    pub freshness: Freshness,
    /// Absent exactly when the entry is unchecked.
    pub status: Option<TriadStatus>,
    pub is_tampered: bool,
    pub stored_hash: Option<String>,
    pub computed_hash: Option<String>,
    pub ledger_hash: Option<String>,
    pub verified_at: Option<String>,
}

/// Full-registry view with recomputed aggregates. Carries no wall-clock stamp
/// of its own so that reconciliation stays idempotent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReconciledView {
    pub total: usize,
    pub verified: usize,
    pub tampered: usize,
    pub pending: usize,
    pub unknown: usize,
    pub unchecked: usize,
    pub entries: Vec<ViewEntry>,
}

fn entry_from_result(result: &VerificationResult) -> ViewEntry {
    ViewEntry {
        id: result.id,
        name: result.name.clone(),
        role: result.role.clone(),
        salary: result.salary,
        freshness: Freshness::Fresh,
        status: Some(result.status),
        is_tampered: result.is_tampered,
        stored_hash: Some(result.stored_hash.clone()),
        computed_hash: Some(result.computed_hash.clone()),
        ledger_hash: result.ledger_hash.clone(),
        verified_at: Some(result.verified_at.clone()),
    }
}

fn entry_unchecked(record: &EmployeeRecord) -> ViewEntry {
    ViewEntry {
        id: record.id,
        name: record.name.clone(),
        role: record.role.clone(),
        salary: record.salary,
        freshness: Freshness::Unchecked,
        status: None,
        is_tampered: false,
        stored_hash: None,
        computed_hash: None,
        ledger_hash: None,
        verified_at: None,
    }
}

fn entry_carried(previous: &ViewEntry, record: &EmployeeRecord) -> ViewEntry {
    let mut entry = previous.clone();
    // Snapshot refreshes to the record's current fields; the verdict is what
    // carries over.
    entry.name = record.name.clone();
    entry.role = record.role.clone();
    entry.salary = record.salary;
    if entry.freshness != Freshness::Unchecked {
        entry.freshness = Freshness::Carried;
    }
    entry
}

/// Merge a verification sample into a view covering the whole record set.
///
/// Rules, in priority order:
/// 1. a record present in `fresh` always takes the fresh verdict;
/// 2. a record absent from `fresh` keeps its previous entry when one exists;
/// 3. anything else is unchecked;
/// 4. records no longer in `full_set` drop out entirely;
/// 5. aggregates are recomputed from the merged entries, never carried over.
pub fn reconcile(
    previous: Option<&ReconciledView>,
    fresh: &[VerificationResult],
    full_set: &[EmployeeRecord],
) -> ReconciledView {
    let fresh_by_id: FxHashMap<i64, &VerificationResult> =
        fresh.iter().map(|r| (r.id, r)).collect();
    let prev_by_id: FxHashMap<i64, &ViewEntry> = previous
        .map(|view| view.entries.iter().map(|e| (e.id, e)).collect())
        .unwrap_or_default();

    let mut ordered: Vec<&EmployeeRecord> = full_set.iter().collect();
    ordered.sort_by_key(|r| r.id);

    let mut entries = Vec::with_capacity(ordered.len());
    for record in ordered {
        let entry = if let Some(result) = fresh_by_id.get(&record.id) {
            entry_from_result(result)
        } else if let Some(prev) = prev_by_id.get(&record.id) {
            entry_carried(prev, record)
        } else {
            entry_unchecked(record)
        };
        entries.push(entry);
    }

    let mut view = ReconciledView {
        total: entries.len(),
        ..Default::default()
    };
    for entry in &entries {
        match entry.status {
            Some(TriadStatus::Verified) => view.verified += 1,
            Some(TriadStatus::Tampered) => view.tampered += 1,
            Some(TriadStatus::AnchorPending) => view.pending += 1,
            Some(TriadStatus::LedgerUnknown) => view.unknown += 1,
            None => view.unchecked += 1,
        }
    }
    view.entries = entries;
    view
}
