//! Hash triad evaluation.
//!
//! A record is verified exactly when its stored hash, the hash recomputed from
//! its current field values, and its ledger-anchored hash all agree. The
//! evaluator is pure: it classifies one record against one ledger observation
//! and never touches storage.

use crate::core::error::BarnacleError;
use crate::core::record::{self, EmployeeRecord};
use crate::core::time;
use serde::{Deserialize, Serialize};

/// What the caller observed about a record's anchor at evaluation time.
/// `Unavailable` means the ledger could not be reached, which is a property of
/// the ledger, not of the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerObservation {
    Anchored(String),
    Pending,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriadStatus {
    /// stored == computed == anchored.
    Verified,
    /// A real mismatch among the hashes that were present.
    Tampered,
    /// Anchor not yet confirmed; indistinguishable from tampering at this
    /// layer, so `is_tampered` stays true, but callers can tell it apart.
    AnchorPending,
    /// Ledger unreachable and the local pair agreed; an outage must never
    /// masquerade as tampering.
    LedgerUnknown,
}

/// Ephemeral per-record verdict. Produced per verification call, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub id: i64,
    pub name: String,
    pub role: String,
    pub salary: i64,
    pub created_at: String,
    pub stored_hash: String,
    pub computed_hash: String,
    pub ledger_hash: Option<String>,
    pub status: TriadStatus,
    pub is_tampered: bool,
    pub verified_at: String,
}

pub fn evaluate(
    record: &EmployeeRecord,
    ledger: &LedgerObservation,
) -> Result<VerificationResult, BarnacleError> {
    record::validate_fields(record.id, &record.name, &record.role, record.salary)?;
    if !record::is_well_formed_hash(&record.stored_hash) {
        return Err(BarnacleError::ValidationError(format!(
            "stored hash for employee {} is malformed",
            record.id
        )));
    }

    let computed_hash = record.compute_hash();
    let pair_intact = record.stored_hash == computed_hash;

    let (status, is_tampered, ledger_hash) = match ledger {
        LedgerObservation::Anchored(anchored) => {
            if pair_intact && computed_hash == *anchored {
                (TriadStatus::Verified, false, Some(anchored.clone()))
            } else {
                (TriadStatus::Tampered, true, Some(anchored.clone()))
            }
        }
        LedgerObservation::Pending => (TriadStatus::AnchorPending, true, None),
        LedgerObservation::Unavailable => {
            if pair_intact {
                (TriadStatus::LedgerUnknown, false, None)
            } else {
                (TriadStatus::Tampered, true, None)
            }
        }
    };

    Ok(VerificationResult {
        id: record.id,
        name: record.name.clone(),
        role: record.role.clone(),
        salary: record.salary,
        created_at: record.created_at.clone(),
        stored_hash: record.stored_hash.clone(),
        computed_hash,
        ledger_hash,
        status,
        is_tampered,
        verified_at: time::now_epoch_z(),
    })
}
