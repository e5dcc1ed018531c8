//! Verification engine: single-record and batch runs.
//!
//! Batch runs evaluate a stable ascending-id sample on a bounded worker pool.
//! A store failure aborts the whole call with no partial results, so the
//! caller's last-known-good view stays intact; a single malformed record is
//! skipped with a warning rather than poisoning the rest of the batch.

use crate::core::config::VerifyConfig;
use crate::core::error::BarnacleError;
use crate::core::ledger::LedgerAnchor;
use crate::core::record::AnchorState;
use crate::core::store::RecordStore;
use crate::core::time;
use crate::core::triad::{self, LedgerObservation, TriadStatus, VerificationResult};
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;

/// Aggregate outcome of one batch run. `total` is the full registry count;
/// the per-status counts cover the sampled results only. `skipped` counts
/// sampled records whose evaluation was rejected as malformed.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub run_id: String,
    pub total: usize,
    pub sampled: usize,
    pub skipped: usize,
    pub verified: usize,
    pub tampered: usize,
    pub pending: usize,
    pub unknown: usize,
    pub results: Vec<VerificationResult>,
}

/// Ledger lookup with outage absorption: an unreachable ledger degrades to an
/// `Unavailable` observation instead of failing the record, per the rule that
/// outages must never read as tampering.
fn observe_ledger(ledger: &dyn LedgerAnchor, record_id: i64) -> LedgerObservation {
    match ledger.lookup(record_id) {
        Ok(AnchorState::Anchored(hash)) => LedgerObservation::Anchored(hash),
        Ok(AnchorState::Pending) => LedgerObservation::Pending,
        Err(err) => {
            eprintln!(
                "Warning: ledger lookup failed for record {}: {}",
                record_id, err
            );
            LedgerObservation::Unavailable
        }
    }
}

pub fn verify_single(
    store_root: &Path,
    ledger: &dyn LedgerAnchor,
    id: i64,
) -> Result<VerificationResult, BarnacleError> {
    let store = RecordStore::new(store_root);
    let record = store
        .get(id)?
        .ok_or_else(|| BarnacleError::NotFound(format!("employee id {}", id)))?;

    let observation = observe_ledger(ledger, record.id);
    let result = triad::evaluate(&record, &observation)?;

    if result.status == TriadStatus::Tampered {
        log_tamper_detected(store_root, None, &result)?;
    }
    Ok(result)
}

pub fn verify_batch(
    store_root: &Path,
    ledger: &dyn LedgerAnchor,
    config: &VerifyConfig,
    limit: Option<usize>,
) -> Result<BatchOutcome, BarnacleError> {
    let store = RecordStore::new(store_root);
    let records = store.get_all()?;
    let total = records.len();

    let sample: Vec<_> = match limit {
        Some(n) => records.into_iter().take(n).collect(),
        None => records,
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.concurrency.max(1))
        .build()
        .map_err(|e| BarnacleError::ValidationError(format!("worker pool: {}", e)))?;

    // par_iter + collect keeps ascending-id order regardless of which worker
    // finishes first, so repeated runs with the same limit are deterministic.
    // A record the evaluator rejects is skipped, not fatal: only store
    // failures abort the batch.
    let results: Vec<VerificationResult> = pool.install(|| {
        sample
            .par_iter()
            .filter_map(|record| {
                let observation = observe_ledger(ledger, record.id);
                match triad::evaluate(record, &observation) {
                    Ok(result) => Some(result),
                    Err(err) => {
                        eprintln!(
                            "Warning: skipping record {} in batch: {}",
                            record.id, err
                        );
                        None
                    }
                }
            })
            .collect()
    });

    let mut outcome = BatchOutcome {
        run_id: time::new_event_id(),
        total,
        sampled: sample.len(),
        skipped: sample.len() - results.len(),
        verified: 0,
        tampered: 0,
        pending: 0,
        unknown: 0,
        results,
    };
    for result in &outcome.results {
        match result.status {
            TriadStatus::Verified => outcome.verified += 1,
            TriadStatus::Tampered => outcome.tampered += 1,
            TriadStatus::AnchorPending => outcome.pending += 1,
            TriadStatus::LedgerUnknown => outcome.unknown += 1,
        }
    }

    log_batch_run(store_root, &outcome)?;
    Ok(outcome)
}

fn audit_events_path(store_root: &Path) -> std::path::PathBuf {
    store_root.join("audit.events.jsonl")
}

fn append_jsonl(path: &Path, value: &serde_json::Value) -> Result<(), BarnacleError> {
    use std::fs::OpenOptions;
    use std::io::Write;
    let mut f = OpenOptions::new().create(true).append(true).open(path)?;
    let line = serde_json::to_string(value)
        .map_err(|e| BarnacleError::ValidationError(format!("event encoding: {}", e)))?;
    writeln!(f, "{}", line)?;
    Ok(())
}

fn log_batch_run(store_root: &Path, outcome: &BatchOutcome) -> Result<(), BarnacleError> {
    append_jsonl(
        &audit_events_path(store_root),
        &serde_json::json!({
            "event_type": "audit.run",
            "ts": time::now_epoch_z(),
            "run_id": outcome.run_id,
            "total": outcome.total,
            "sampled": outcome.sampled,
            "skipped": outcome.skipped,
            "verified": outcome.verified,
            "tampered": outcome.tampered,
            "pending": outcome.pending,
            "unknown": outcome.unknown,
        }),
    )?;
    for result in outcome.results.iter().filter(|r| r.status == TriadStatus::Tampered) {
        log_tamper_detected(store_root, Some(&outcome.run_id), result)?;
    }
    Ok(())
}

fn log_tamper_detected(
    store_root: &Path,
    run_id: Option<&str>,
    result: &VerificationResult,
) -> Result<(), BarnacleError> {
    append_jsonl(
        &audit_events_path(store_root),
        &serde_json::json!({
            "event_type": "audit.tamper_detected",
            "ts": time::now_epoch_z(),
            "event_id": time::new_event_id(),
            "run_id": run_id,
            "record_id": result.id,
            "stored_hash": result.stored_hash,
            "computed_hash": result.computed_hash,
            "ledger_hash": result.ledger_hash,
        }),
    )
}
