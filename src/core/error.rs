use crate::core::record::ConflictRecord;
use rusqlite;
use std::fmt;
use std::io;
use thiserror::Error;

/// Why a creation request was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ConflictKind {
    /// The requested id is already taken. Never overridable.
    IdCollision(i64),
    /// The requested name matches existing records. Overridable with force-duplicate.
    NameCollision {
        name: String,
        conflicts: Vec<ConflictRecord>,
    },
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::IdCollision(id) => {
                write!(f, "employee id {} already exists", id)
            }
            ConflictKind::NameCollision { name, conflicts } => {
                let ids: Vec<String> = conflicts.iter().map(|c| c.id.to_string()).collect();
                write!(
                    f,
                    "employee name '{}' already exists (ids: {}); pass force-duplicate to override",
                    name,
                    ids.join(", ")
                )
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum BarnacleError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Failed to initialize database: {0}")]
    DatabaseInitializationError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(ConflictKind),
    #[error("Precondition failed: {0}")]
    PreconditionError(String),
    #[error("Record store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),
}
