//! Employee record model and canonical hashing.
//!
//! The canonical line is the frozen hash input for every record. Field order
//! and encoding must never change: any alteration would invalidate every
//! previously stored and anchored hash at once.

use crate::core::error::BarnacleError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub id: i64,
    pub name: String,
    pub role: String,
    /// Whole currency units; must be non-negative.
    pub salary: i64,
    pub created_at: String,
    /// Hash of the canonical line at last legitimate write.
    pub stored_hash: String,
    /// Ledger-anchored hash; `None` means the anchor is still pending.
    pub ledger_hash: Option<String>,
}

/// Minimal projection surfaced in duplicate-name conflict sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub id: i64,
    pub name: String,
    pub role: String,
}

/// Closed set of mutable fields for in-place updates that skip rehashing.
/// Being an enum keeps the allow-list exhaustive at compile time.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Name(String),
    Role(String),
    Salary(i64),
}

/// Outcome of an anchoring request or ledger lookup. `Pending` is a valid
/// non-error state, distinct from both a real hash and a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "hash", rename_all = "snake_case")]
pub enum AnchorState {
    Pending,
    Anchored(String),
}

impl AnchorState {
    pub fn as_anchored(&self) -> Option<&str> {
        match self {
            AnchorState::Anchored(hash) => Some(hash),
            AnchorState::Pending => None,
        }
    }
}

/// Canonical field representation. `|` separators keep adjacent fields from
/// bleeding into each other ("ab"+"c" vs "a"+"bc").
pub fn canonical_line(id: i64, name: &str, role: &str, salary: i64, created_at: &str) -> String {
    format!("{}|{}|{}|{}|{}", id, name, role, salary, created_at)
}

pub fn record_hash(id: i64, name: &str, role: &str, salary: i64, created_at: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_line(id, name, role, salary, created_at).as_bytes());
    format!("{:x}", hasher.finalize())
}

fn hash_shape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9a-f]{64}$").expect("valid hash regex"))
}

/// Lowercase sha256 hex, 64 chars.
pub fn is_well_formed_hash(candidate: &str) -> bool {
    hash_shape().is_match(candidate)
}

pub fn validate_fields(
    id: i64,
    name: &str,
    role: &str,
    salary: i64,
) -> Result<(), BarnacleError> {
    if id <= 0 {
        return Err(BarnacleError::ValidationError(format!(
            "employee id must be a positive integer, got {}",
            id
        )));
    }
    if name.trim().is_empty() {
        return Err(BarnacleError::ValidationError(
            "employee name must not be empty".to_string(),
        ));
    }
    if role.trim().is_empty() {
        return Err(BarnacleError::ValidationError(
            "employee role must not be empty".to_string(),
        ));
    }
    if salary < 0 {
        return Err(BarnacleError::ValidationError(format!(
            "employee salary must be non-negative, got {}",
            salary
        )));
    }
    Ok(())
}

impl EmployeeRecord {
    /// Recompute the hash from the record's current field values.
    pub fn compute_hash(&self) -> String {
        record_hash(self.id, &self.name, &self.role, self.salary, &self.created_at)
    }
}
