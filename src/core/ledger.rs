//! Ledger anchoring seam.
//!
//! The engine only ever talks to `LedgerAnchor`; the concrete ledger behind it
//! is replaceable. `FileLedger` is the local-first implementation: an
//! append-only JSONL chain that nothing in Barnacle ever rewrites or deletes.
//! Deleting a record from the registry leaves its anchored hashes discoverable
//! here forever.

use crate::core::error::BarnacleError;
use crate::core::record::AnchorState;
use crate::core::time;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use ulid::Ulid;

pub const LEDGER_CHAIN_FILE: &str = "ledger.chain.jsonl";

/// External anchoring service interface. Anchoring may complete asynchronously;
/// `Pending` is a valid result of both operations, not a failure.
pub trait LedgerAnchor: Sync {
    fn anchor(&self, record_id: i64, record_hash: &str) -> Result<AnchorState, BarnacleError>;
    fn lookup(&self, record_id: i64) -> Result<AnchorState, BarnacleError>;
}

/// One immutable chain entry. `tx_id` is the transaction handle callers can
/// use to locate an anchor after the record itself is gone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub ts: String,
    pub tx_id: String,
    pub record_id: i64,
    pub record_hash: String,
}

/// Append-only file-backed ledger. In deferred mode `anchor` acknowledges the
/// request with `Pending` and the chain write happens later via `sync_pending`
/// on the anchor plugin, mirroring an asynchronous anchoring service.
pub struct FileLedger {
    root: PathBuf,
    deferred: bool,
}

impl FileLedger {
    pub fn new(root: &Path, deferred: bool) -> Self {
        Self {
            root: root.to_path_buf(),
            deferred,
        }
    }

    pub fn chain_path(&self) -> PathBuf {
        self.root.join(LEDGER_CHAIN_FILE)
    }

    /// Full transaction history, oldest first.
    pub fn transactions(&self) -> Result<Vec<LedgerTransaction>, BarnacleError> {
        let path = self.chain_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&path).map_err(BarnacleError::IoError)?;
        let mut out = Vec::new();
        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            let tx: LedgerTransaction = serde_json::from_str(line).map_err(|e| {
                BarnacleError::LedgerUnavailable(format!("corrupt chain entry: {}", e))
            })?;
            out.push(tx);
        }
        Ok(out)
    }

    fn append(&self, record_id: i64, record_hash: &str) -> Result<LedgerTransaction, BarnacleError> {
        let tx = LedgerTransaction {
            ts: time::now_epoch_z(),
            tx_id: Ulid::new().to_string(),
            record_id,
            record_hash: record_hash.to_string(),
        };
        let line = serde_json::to_string(&tx).map_err(|e| {
            BarnacleError::LedgerUnavailable(format!("failed to encode transaction: {}", e))
        })?;
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.chain_path())
            .map_err(|e| {
                BarnacleError::LedgerUnavailable(format!("cannot open ledger chain: {}", e))
            })?;
        writeln!(f, "{}", line)
            .map_err(|e| BarnacleError::LedgerUnavailable(format!("chain append failed: {}", e)))?;
        Ok(tx)
    }

    /// Immediate anchoring regardless of the deferred flag. Used by the sync
    /// path that drains pending anchors.
    pub fn anchor_now(&self, record_id: i64, record_hash: &str) -> Result<AnchorState, BarnacleError> {
        let tx = self.append(record_id, record_hash)?;
        Ok(AnchorState::Anchored(tx.record_hash))
    }
}

impl LedgerAnchor for FileLedger {
    fn anchor(&self, record_id: i64, record_hash: &str) -> Result<AnchorState, BarnacleError> {
        if self.deferred {
            return Ok(AnchorState::Pending);
        }
        self.anchor_now(record_id, record_hash)
    }

    /// Latest chain entry wins; an id that was never anchored reads as
    /// `Pending`, never as an error.
    fn lookup(&self, record_id: i64) -> Result<AnchorState, BarnacleError> {
        let latest = self
            .transactions()?
            .into_iter()
            .rev()
            .find(|tx| tx.record_id == record_id);
        Ok(match latest {
            Some(tx) => AnchorState::Anchored(tx.record_hash),
            None => AnchorState::Pending,
        })
    }
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "ledger",
        "version": "0.1.0",
        "description": "Append-only anchor chain standing in for the external ledger",
        "storage": [LEDGER_CHAIN_FILE]
    })
}
