use crate::core::error::BarnacleError;
use crate::core::ledger::FileLedger;
use crate::core::output;
use crate::core::store::RecordStore;
use clap::{Parser, Subcommand};
use std::path::Path;

#[derive(Parser, Debug)]
#[clap(name = "anchor", about = "Ledger anchoring operations.")]
pub struct AnchorCli {
    /// Output machine-readable JSON.
    #[clap(long, global = true)]
    json: bool,
    #[clap(subcommand)]
    command: AnchorCommand,
}

#[derive(Subcommand, Debug)]
pub enum AnchorCommand {
    /// Anchor every record whose ledger hash is still unconfirmed.
    Sync,
    /// Show the ledger transaction history.
    Transactions,
    /// Show anchoring counts.
    Status,
}

/// Complete every unconfirmed anchor: append each stored hash to the chain
/// and back-fill the registry's ledger hash. Returns how many were anchored.
pub fn sync_pending(root: &Path, ledger: &FileLedger) -> Result<usize, BarnacleError> {
    let store = RecordStore::new(root);
    let pending = store.pending_anchors()?;
    let mut anchored = 0;
    for (id, stored_hash) in pending {
        let state = ledger.anchor_now(id, &stored_hash)?;
        if let Some(hash) = state.as_anchored() {
            store.set_ledger_hash(id, hash)?;
            anchored += 1;
        }
    }
    Ok(anchored)
}

pub fn execute_anchor_cli(
    root: &Path,
    ledger: &FileLedger,
    cli: &AnchorCli,
) -> Result<(), BarnacleError> {
    match &cli.command {
        AnchorCommand::Sync => {
            let anchored = sync_pending(root, ledger)?;
            if cli.json {
                println!("{}", serde_json::json!({ "anchored": anchored }));
            } else if anchored == 0 {
                println!("No pending anchors.");
            } else {
                println!("Anchored {} record hash(es).", anchored);
            }
            Ok(())
        }
        AnchorCommand::Transactions => {
            let transactions = ledger.transactions()?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&transactions).unwrap_or_default()
                );
            } else if transactions.is_empty() {
                println!("Ledger chain is empty.");
            } else {
                for tx in &transactions {
                    println!(
                        "{}  {}  record {}  {}",
                        tx.ts,
                        tx.tx_id,
                        tx.record_id,
                        output::short_hash(Some(&tx.record_hash))
                    );
                }
                println!("{} transaction(s)", transactions.len());
            }
            Ok(())
        }
        AnchorCommand::Status => {
            let store = RecordStore::new(root);
            let total = store.count()?;
            let pending = store.pending_anchors()?.len();
            let chain_len = ledger.transactions()?.len();
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "records": total,
                        "pending_anchors": pending,
                        "chain_transactions": chain_len,
                    })
                );
            } else {
                println!(
                    "{} record(s), {} pending anchor(s), {} chain transaction(s)",
                    total, pending, chain_len
                );
            }
            Ok(())
        }
    }
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "anchor",
        "version": "0.1.0",
        "description": "Anchoring lifecycle over the append-only ledger chain",
        "commands": [
            { "name": "sync", "description": "Complete unconfirmed anchors" },
            { "name": "transactions", "description": "List chain history" },
            { "name": "status", "description": "Anchoring counts" }
        ],
        "storage": ["ledger.chain.jsonl"]
    })
}
