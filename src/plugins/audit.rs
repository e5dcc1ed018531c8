use crate::core::config::VerifyConfig;
use crate::core::error::BarnacleError;
use crate::core::ledger::LedgerAnchor;
use crate::core::output;
use crate::core::reconcile::{self, Freshness, ReconciledView};
use crate::core::store::RecordStore;
use crate::core::triad::{TriadStatus, VerificationResult};
use crate::core::verifier;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::Path;

pub const DASHBOARD_VIEW_FILE: &str = "dashboard.view.json";

#[derive(Parser, Debug)]
#[clap(name = "audit", about = "Re-verify record hashes against the ledger.")]
pub struct AuditCli {
    /// Output machine-readable JSON.
    #[clap(long, global = true)]
    json: bool,
    #[clap(subcommand)]
    command: AuditCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuditCommand {
    /// Verify a single record.
    Record {
        #[clap(long)]
        id: i64,
    },
    /// Verify a batch of records in ascending-id order.
    Batch {
        /// Verify at most this many records (default: all).
        #[clap(long)]
        limit: Option<usize>,
    },
    /// Run a batch and merge it into the held full-registry view.
    Dashboard {
        #[clap(long)]
        limit: Option<usize>,
        /// Discard the held view and start over.
        #[clap(long)]
        reset: bool,
    },
}

/// The caller-held view from the last dashboard run, if any. An unreadable
/// file is discarded with a warning rather than wedging the dashboard.
pub fn load_held_view(root: &Path) -> Result<Option<ReconciledView>, BarnacleError> {
    let path = root.join(DASHBOARD_VIEW_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(&path).map_err(BarnacleError::IoError)?;
    match serde_json::from_str(&raw) {
        Ok(view) => Ok(Some(view)),
        Err(err) => {
            eprintln!("Warning: discarding unreadable dashboard view: {}", err);
            Ok(None)
        }
    }
}

/// Verify up to `limit` records and reconcile into the held view. On store
/// failure nothing is written, so the previous view file remains the
/// last-known-good state.
pub fn run_dashboard(
    root: &Path,
    ledger: &dyn LedgerAnchor,
    config: &VerifyConfig,
    limit: Option<usize>,
    reset: bool,
) -> Result<ReconciledView, BarnacleError> {
    let previous = if reset { None } else { load_held_view(root)? };

    let store = RecordStore::new(root);
    let full_set = store.get_all()?;
    let outcome = verifier::verify_batch(root, ledger, config, limit)?;

    let view = reconcile::reconcile(previous.as_ref(), &outcome.results, &full_set);

    let encoded = serde_json::to_string_pretty(&view)
        .map_err(|e| BarnacleError::ValidationError(format!("view encoding: {}", e)))?;
    fs::write(root.join(DASHBOARD_VIEW_FILE), encoded).map_err(BarnacleError::IoError)?;
    Ok(view)
}

fn status_label(status: Option<TriadStatus>) -> String {
    use colored::Colorize;
    match status {
        Some(TriadStatus::Verified) => "verified".green().to_string(),
        Some(TriadStatus::Tampered) => "TAMPERED".red().bold().to_string(),
        Some(TriadStatus::AnchorPending) => "anchor pending".yellow().to_string(),
        Some(TriadStatus::LedgerUnknown) => "ledger unknown".yellow().to_string(),
        None => "not yet checked".dimmed().to_string(),
    }
}

fn print_result_line(result: &VerificationResult) {
    println!(
        "{:<6} {:<24} {}  stored={} computed={} ledger={}",
        result.id,
        output::compact_line(&result.name, 24),
        status_label(Some(result.status)),
        output::short_hash(Some(&result.stored_hash)),
        output::short_hash(Some(&result.computed_hash)),
        output::short_hash(result.ledger_hash.as_deref()),
    );
}

pub fn execute_audit_cli(
    root: &Path,
    ledger: &dyn LedgerAnchor,
    config: &VerifyConfig,
    cli: &AuditCli,
) -> Result<(), BarnacleError> {
    match &cli.command {
        AuditCommand::Record { id } => {
            let result = verifier::verify_single(root, ledger, *id)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result).unwrap_or_default());
            } else {
                print_result_line(&result);
            }
            Ok(())
        }
        AuditCommand::Batch { limit } => {
            let outcome = verifier::verify_batch(root, ledger, config, *limit)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome).unwrap_or_default());
            } else {
                for result in &outcome.results {
                    print_result_line(result);
                }
                println!(
                    "Summary: total={} sampled={} skipped={} verified={} tampered={} pending={} unknown={}",
                    outcome.total,
                    outcome.sampled,
                    outcome.skipped,
                    outcome.verified,
                    outcome.tampered,
                    outcome.pending,
                    outcome.unknown
                );
            }
            if outcome.tampered > 0 {
                return Err(BarnacleError::ValidationError(format!(
                    "tampering detected in {} record(s)",
                    outcome.tampered
                )));
            }
            Ok(())
        }
        AuditCommand::Dashboard { limit, reset } => {
            let view = run_dashboard(root, ledger, config, *limit, *reset)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&view).unwrap_or_default());
            } else {
                for entry in &view.entries {
                    let freshness = match entry.freshness {
                        Freshness::Fresh => "fresh",
                        Freshness::Carried => "carried",
                        Freshness::Unchecked => "",
                    };
                    println!(
                        "{:<6} {:<24} {:<16} {:>10}  {:<18} {}",
                        entry.id,
                        output::compact_line(&entry.name, 24),
                        output::compact_line(&entry.role, 16),
                        entry.salary,
                        status_label(entry.status),
                        freshness,
                    );
                }
                println!(
                    "Summary: total={} verified={} tampered={} pending={} unknown={} unchecked={}",
                    view.total,
                    view.verified,
                    view.tampered,
                    view.pending,
                    view.unknown,
                    view.unchecked
                );
            }
            Ok(())
        }
    }
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "audit",
        "version": "0.1.0",
        "description": "Triad verification over the registry with sample reconciliation",
        "commands": [
            { "name": "record", "description": "Verify one record" },
            { "name": "batch", "description": "Verify up to N records, all-or-nothing" },
            { "name": "dashboard", "description": "Merge a batch into the held full-registry view" }
        ],
        "events": ["audit.run", "audit.tamper_detected"],
        "storage": ["audit.events.jsonl", DASHBOARD_VIEW_FILE]
    })
}
