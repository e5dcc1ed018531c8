use crate::core::error::BarnacleError;
use crate::core::store::RecordStore;
use crate::plugins::roster;
use clap::{Parser, Subcommand};
use std::path::Path;

/// Exact phrase required by `purge all`. Friction against accidents, not a
/// security boundary: the ledger chain survives either way.
pub const PURGE_ALL_CONFIRMATION: &str = "DELETE ALL EMPLOYEE RECORDS";

#[derive(Parser, Debug)]
#[clap(name = "purge", about = "Delete records. Ledger history is never touched.")]
pub struct PurgeCli {
    #[clap(subcommand)]
    command: PurgeCommand,
}

#[derive(Subcommand, Debug)]
pub enum PurgeCommand {
    /// Delete a single record.
    Record {
        #[clap(long)]
        id: i64,
    },
    /// Delete every record and reset the id counter.
    All {
        /// Must be exactly the confirmation phrase.
        #[clap(long)]
        confirm: String,
    },
}

pub fn delete_one(root: &Path, id: i64) -> Result<(), BarnacleError> {
    let store = RecordStore::new(root);
    if !store.delete(id)? {
        return Err(BarnacleError::NotFound(format!("employee id {}", id)));
    }
    roster::record_roster_event(root, "roster.delete", Some(id), serde_json::json!({}))?;
    Ok(())
}

/// Wipe the registry. The confirmation must match the phrase exactly; case
/// variants and substrings are rejected.
pub fn delete_all(root: &Path, confirmation: &str) -> Result<usize, BarnacleError> {
    if confirmation != PURGE_ALL_CONFIRMATION {
        return Err(BarnacleError::PreconditionError(format!(
            "bulk delete requires the exact confirmation phrase '{}'",
            PURGE_ALL_CONFIRMATION
        )));
    }
    let store = RecordStore::new(root);
    let deleted = store.delete_all()?;
    roster::record_roster_event(
        root,
        "roster.purge",
        None,
        serde_json::json!({ "deleted_count": deleted }),
    )?;
    Ok(deleted)
}

pub fn execute_purge_cli(root: &Path, cli: &PurgeCli) -> Result<(), BarnacleError> {
    match &cli.command {
        PurgeCommand::Record { id } => {
            delete_one(root, *id)?;
            println!("Deleted employee {}. Its anchored hashes remain in the ledger chain.", id);
            Ok(())
        }
        PurgeCommand::All { confirm } => {
            let deleted = delete_all(root, confirm)?;
            println!(
                "Deleted {} record(s) and reset the id counter. Ledger history kept.",
                deleted
            );
            Ok(())
        }
    }
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "purge",
        "version": "0.1.0",
        "description": "Confirmation-gated destructive operations",
        "commands": [
            { "name": "record", "description": "Delete one record" },
            { "name": "all", "description": "Delete everything; requires the confirmation phrase" }
        ],
        "events": ["roster.delete", "roster.purge"],
        "storage": []
    })
}
