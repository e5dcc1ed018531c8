//! Barnacle: a local-first, tamper-evident employee record ledger.
//!
//! Every record is hashed at write time from a frozen canonical field
//! representation, anchored to an append-only ledger chain, and re-verified on
//! demand by recomputing the hash and comparing all three copies: stored,
//! computed, anchored. A record is verified only when the whole triad agrees.
//!
//! # Architecture
//!
//! - **Registry**: SQLite database holding employee records. All mutations
//!   route through the [`core::broker::DbBroker`] thin waist, which
//!   serializes access and appends an audit row per operation.
//! - **Ledger chain**: append-only JSONL file behind the
//!   [`core::ledger::LedgerAnchor`] trait. Nothing ever rewrites or deletes
//!   chain entries; deleting a record leaves its anchored hashes
//!   discoverable in the transaction history.
//! - **Engine**: the triad evaluator ([`core::triad`]), the batch verifier
//!   ([`core::verifier`]), and the sample-to-full-set reconciliation
//!   ([`core::reconcile`]) that lets dashboards refine progressively without
//!   ever shrinking the visible record count.
//!
//! # Subsystems
//!
//! - `roster`: record lifecycle with duplicate-name resolution
//! - `audit`: single/batch verification and the reconciled dashboard
//! - `anchor`: anchoring sync, transaction history
//! - `tamper`: demo-only field rewrite without rehash
//! - `purge`: confirmation-gated destructive operations
//!
//! ```bash
//! barnacle init
//! barnacle roster add --id 1 --name Ana --role Eng --salary 80000
//! barnacle tamper --id 1 --field salary --value 90000
//! barnacle audit record --id 1   # flagged as tampered
//! ```

pub mod core;
pub mod plugins;

use crate::core::{config, db, error, ledger::FileLedger};
use plugins::{anchor, audit, purge, roster, tamper};

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[clap(
    name = "barnacle",
    version = env!("CARGO_PKG_VERSION"),
    about = "Tamper-evident employee record ledger: hash, anchor, re-verify."
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct InitCli {
    /// Directory to initialize (defaults to current working directory).
    #[clap(short, long)]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a Barnacle project (registry database plus default config).
    Init(InitCli),
    /// Manage employee records.
    Roster(roster::RosterCli),
    /// Re-verify record hashes against the ledger.
    Audit(audit::AuditCli),
    /// Ledger anchoring operations.
    Anchor(anchor::AnchorCli),
    /// Demo-only tamper simulation.
    Tamper(tamper::TamperCli),
    /// Delete records behind confirmation gates.
    Purge(purge::PurgeCli),
    /// Print subsystem schema descriptors.
    Schemas,
    /// Print the version.
    Version,
}

fn find_barnacle_project_root(start_dir: &Path) -> Result<PathBuf, error::BarnacleError> {
    let mut current_dir = PathBuf::from(start_dir);
    loop {
        if current_dir.join(".barnacle").exists() {
            return Ok(current_dir);
        }
        if !current_dir.pop() {
            return Err(error::BarnacleError::NotFound(
                "'.barnacle' directory not found in current or parent directories. Run `barnacle init` first.".to_string(),
            ));
        }
    }
}

fn init_project(dir: Option<PathBuf>) -> Result<(), error::BarnacleError> {
    use colored::Colorize;

    let raw_dir = match dir {
        Some(d) => d,
        None => std::env::current_dir()?,
    };
    let target_dir = fs::canonicalize(&raw_dir).map_err(error::BarnacleError::IoError)?;

    let barnacle_dir = target_dir.join(".barnacle");
    let store_root = barnacle_dir.join("data");
    fs::create_dir_all(&store_root).map_err(error::BarnacleError::IoError)?;

    db::initialize_registry_db(&store_root)?;

    let config_path = barnacle_dir.join(config::CONFIG_FILE_NAME);
    if !config_path.exists() {
        fs::write(&config_path, config::default_config_toml())
            .map_err(error::BarnacleError::IoError)?;
    }

    println!(
        "{} {}",
        "🦪 Barnacle".bold(),
        "anchored.".green().bold()
    );
    println!("Registry at {}", store_root.display());
    println!("Config at {}", config_path.display());
    Ok(())
}

fn print_schemas() {
    let schemas = serde_json::json!([
        roster::schema(),
        audit::schema(),
        anchor::schema(),
        tamper::schema(),
        purge::schema(),
        crate::core::broker::schema(),
        crate::core::ledger::schema(),
    ]);
    println!(
        "{}",
        serde_json::to_string_pretty(&schemas).unwrap_or_default()
    );
}

pub fn run() -> Result<(), error::BarnacleError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Version => {
            println!("v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Init(init_cli) => init_project(init_cli.dir),
        Command::Schemas => {
            print_schemas();
            Ok(())
        }
        command => {
            let current_dir = std::env::current_dir()?;
            let project_root = find_barnacle_project_root(&current_dir)?;
            let store_root = project_root.join(".barnacle").join("data");
            let cfg = config::load_config(&project_root)?;
            let ledger = FileLedger::new(&store_root, cfg.anchor.deferred);

            match command {
                Command::Roster(roster_cli) => {
                    roster::execute_roster_cli(&store_root, &ledger, &roster_cli)
                }
                Command::Audit(audit_cli) => {
                    audit::execute_audit_cli(&store_root, &ledger, &cfg.verify, &audit_cli)
                }
                Command::Anchor(anchor_cli) => {
                    anchor::execute_anchor_cli(&store_root, &ledger, &anchor_cli)
                }
                Command::Tamper(tamper_cli) => tamper::execute_tamper_cli(&store_root, &tamper_cli),
                Command::Purge(purge_cli) => purge::execute_purge_cli(&store_root, &purge_cli),
                Command::Init(_) | Command::Schemas | Command::Version => unreachable!(),
            }
        }
    }
}
