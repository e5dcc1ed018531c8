use crate::core::error::{BarnacleError, ConflictKind};
use crate::core::ledger::LedgerAnchor;
use crate::core::output;
use crate::core::record::{self, AnchorState, ConflictRecord, EmployeeRecord};
use crate::core::store::{RecordFilter, RecordStore};
use crate::core::time;
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;
use ulid::Ulid;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[clap(name = "roster", about = "Manage employee records in the registry.")]
pub struct RosterCli {
    /// Output format for this command group.
    #[clap(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
    #[clap(subcommand)]
    command: RosterCommand,
}

#[derive(Subcommand, Debug)]
pub enum RosterCommand {
    /// Add a record: hash it, persist it, request a ledger anchor.
    Add {
        /// Externally assigned id. Defaults to the next free id.
        #[clap(long)]
        id: Option<i64>,
        #[clap(long)]
        name: String,
        #[clap(long)]
        role: String,
        /// Whole currency units, non-negative.
        #[clap(long)]
        salary: i64,
        /// Proceed even when the name matches existing records.
        #[clap(long)]
        force_duplicate: bool,
    },
    /// Show one record.
    Get {
        #[clap(long)]
        id: i64,
    },
    /// List records, optionally filtered.
    List {
        #[clap(long)]
        name: Option<String>,
        #[clap(long)]
        role: Option<String>,
        #[clap(long)]
        min_salary: Option<i64>,
        #[clap(long)]
        max_salary: Option<i64>,
    },
    /// Check a candidate name against existing records before creation.
    CheckDuplicate {
        #[clap(value_name = "NAME")]
        name: String,
    },
    /// Print the next free id.
    NextId,
}

/// Name-collision check outcome. Non-authoritative: creation is only ever
/// blocked by the caller declining to override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateConflictSet {
    pub exists: bool,
    pub conflicts: Vec<ConflictRecord>,
}

/// Creation request before ids, timestamps, and hashes are assigned.
#[derive(Debug, Clone)]
pub struct RecordDraft {
    pub id: Option<i64>,
    pub name: String,
    pub role: String,
    pub salary: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct RosterEvent {
    ts: String,
    event_id: String,
    event_type: String,
    record_id: Option<i64>,
    payload: JsonValue,
    actor: String,
}

/// Append a lifecycle event to `roster.events.jsonl`. Shared with the tamper
/// and purge plugins, which are also record-lifecycle mutations.
pub fn record_roster_event(
    root: &Path,
    event_type: &str,
    record_id: Option<i64>,
    payload: JsonValue,
) -> Result<(), BarnacleError> {
    use std::fs::OpenOptions;
    use std::io::Write;

    let ev = RosterEvent {
        ts: time::now_epoch_z(),
        event_id: Ulid::new().to_string(),
        event_type: event_type.to_string(),
        record_id,
        payload,
        actor: "barnacle".to_string(),
    };
    let line = serde_json::to_string(&ev)
        .map_err(|e| BarnacleError::ValidationError(format!("event encoding: {}", e)))?;
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(root.join("roster.events.jsonl"))
        .map_err(BarnacleError::IoError)?;
    writeln!(f, "{}", line).map_err(BarnacleError::IoError)?;
    Ok(())
}

pub fn check_duplicate(root: &Path, name: &str) -> Result<DuplicateConflictSet, BarnacleError> {
    let store = RecordStore::new(root);
    let conflicts = store.find_by_name(name)?;
    Ok(DuplicateConflictSet {
        exists: !conflicts.is_empty(),
        conflicts,
    })
}

/// Create a record. Id collisions are always hard failures; name collisions
/// fail with the conflict set unless `force_duplicate` is set.
pub fn create_record(
    root: &Path,
    ledger: &dyn LedgerAnchor,
    draft: &RecordDraft,
    force_duplicate: bool,
) -> Result<EmployeeRecord, BarnacleError> {
    let store = RecordStore::new(root);
    let id = match draft.id {
        Some(id) => id,
        None => store.next_id()?,
    };
    record::validate_fields(id, &draft.name, &draft.role, draft.salary)?;

    if store.get(id)?.is_some() {
        return Err(BarnacleError::Conflict(ConflictKind::IdCollision(id)));
    }
    if !force_duplicate {
        let conflicts = store.find_by_name(&draft.name)?;
        if !conflicts.is_empty() {
            return Err(BarnacleError::Conflict(ConflictKind::NameCollision {
                name: draft.name.clone(),
                conflicts,
            }));
        }
    }

    let created_at = time::now_epoch_z();
    let stored_hash = record::record_hash(id, &draft.name, &draft.role, draft.salary, &created_at);
    let mut new_record = EmployeeRecord {
        id,
        name: draft.name.clone(),
        role: draft.role.clone(),
        salary: draft.salary,
        created_at,
        stored_hash,
        ledger_hash: None,
    };
    store.put(&new_record)?;

    record_roster_event(
        root,
        "roster.add",
        Some(id),
        serde_json::json!({
            "name": new_record.name,
            "role": new_record.role,
            "salary": new_record.salary,
            "stored_hash": new_record.stored_hash,
            "force_duplicate": force_duplicate,
        }),
    )?;

    // Anchoring may complete immediately, stay pending, or be temporarily
    // unreachable. The last case is absorbed: the record exists either way and
    // `anchor sync` retries unconfirmed anchors later.
    match ledger.anchor(id, &new_record.stored_hash) {
        Ok(AnchorState::Anchored(hash)) => {
            store.set_ledger_hash(id, &hash)?;
            new_record.ledger_hash = Some(hash);
        }
        Ok(AnchorState::Pending) => {}
        Err(err) => {
            eprintln!("Warning: anchor request for record {} deferred: {}", id, err);
        }
    }

    Ok(new_record)
}

pub fn get_record(root: &Path, id: i64) -> Result<EmployeeRecord, BarnacleError> {
    let store = RecordStore::new(root);
    store
        .get(id)?
        .ok_or_else(|| BarnacleError::NotFound(format!("employee id {}", id)))
}

pub fn list_records(
    root: &Path,
    filter: &RecordFilter,
) -> Result<Vec<EmployeeRecord>, BarnacleError> {
    let store = RecordStore::new(root);
    store.search(filter)
}

fn anchor_label(record: &EmployeeRecord) -> String {
    use colored::Colorize;
    match &record.ledger_hash {
        Some(hash) => format!("anchored {}", output::short_hash(Some(hash))).green().to_string(),
        None => "anchor pending".yellow().to_string(),
    }
}

fn print_record(record: &EmployeeRecord) {
    println!(
        "{:<6} {:<24} {:<16} {:>10}  {}  {}",
        record.id,
        output::compact_line(&record.name, 24),
        output::compact_line(&record.role, 16),
        record.salary,
        output::short_hash(Some(&record.stored_hash)),
        anchor_label(record),
    );
}

pub fn execute_roster_cli(
    root: &Path,
    ledger: &dyn LedgerAnchor,
    cli: &RosterCli,
) -> Result<(), BarnacleError> {
    match &cli.command {
        RosterCommand::Add {
            id,
            name,
            role,
            salary,
            force_duplicate,
        } => {
            let draft = RecordDraft {
                id: *id,
                name: name.clone(),
                role: role.clone(),
                salary: *salary,
            };
            let created = create_record(root, ledger, &draft, *force_duplicate)?;
            if cli.format == OutputFormat::Json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&time::command_envelope(
                        "roster.add",
                        "ok",
                        serde_json::json!({ "record": created }),
                    ))
                    .unwrap_or_default()
                );
            } else {
                println!(
                    "Added employee {} ({}) with hash {}",
                    created.id,
                    created.name,
                    output::short_hash(Some(&created.stored_hash))
                );
                if created.ledger_hash.is_none() {
                    println!("Ledger anchor pending; run `barnacle anchor sync` to complete it.");
                }
            }
            Ok(())
        }
        RosterCommand::Get { id } => {
            let found = get_record(root, *id)?;
            if cli.format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&found).unwrap_or_default());
            } else {
                print_record(&found);
                println!("  created_at:  {}", found.created_at);
                println!("  stored_hash: {}", found.stored_hash);
                println!(
                    "  ledger_hash: {}",
                    found.ledger_hash.as_deref().unwrap_or("(pending)")
                );
            }
            Ok(())
        }
        RosterCommand::List {
            name,
            role,
            min_salary,
            max_salary,
        } => {
            let filter = RecordFilter {
                name: name.clone(),
                role: role.clone(),
                min_salary: *min_salary,
                max_salary: *max_salary,
            };
            let records = list_records(root, &filter)?;
            if cli.format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&records).unwrap_or_default());
            } else if records.is_empty() {
                println!("No records found.");
            } else {
                for record in &records {
                    print_record(record);
                }
                println!("{} record(s)", records.len());
            }
            Ok(())
        }
        RosterCommand::CheckDuplicate { name } => {
            let set = check_duplicate(root, name)?;
            if cli.format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&set).unwrap_or_default());
            } else if !set.exists {
                println!("Name '{}' is unused.", name);
            } else {
                println!("Name '{}' already exists:", name);
                for conflict in &set.conflicts {
                    println!("- id {} ({}, {})", conflict.id, conflict.name, conflict.role);
                }
                println!("Pass --force-duplicate to create it anyway.");
            }
            Ok(())
        }
        RosterCommand::NextId => {
            let store = RecordStore::new(root);
            let next = store.next_id()?;
            if cli.format == OutputFormat::Json {
                println!("{}", serde_json::json!({ "next_id": next }));
            } else {
                println!("{}", next);
            }
            Ok(())
        }
    }
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "roster",
        "version": "0.1.0",
        "description": "Employee record lifecycle with duplicate-name resolution",
        "commands": [
            { "name": "add", "description": "Create a record and request a ledger anchor" },
            { "name": "get", "description": "Show one record" },
            { "name": "list", "description": "List/filter records" },
            { "name": "check-duplicate", "description": "Pre-creation name collision check" },
            { "name": "next-id", "description": "Next free id suggestion" }
        ],
        "events": ["roster.add", "roster.delete", "roster.purge", "roster.tamper_simulated"],
        "storage": ["registry.db", "roster.events.jsonl"]
    })
}
