use crate::core::error::BarnacleError;
use crate::core::record::{EmployeeRecord, FieldUpdate};
use crate::core::store::RecordStore;
use crate::plugins::roster;
use clap::{Parser, ValueEnum};
use std::path::Path;

/// Fields the simulator may rewrite. Closed on purpose: anything outside this
/// list is rejected at parse time.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum TamperField {
    Name,
    Role,
    Salary,
}

#[derive(Parser, Debug)]
#[clap(
    name = "tamper",
    about = "Demo-only: rewrite a field without rehashing, so the next audit flags it."
)]
pub struct TamperCli {
    #[clap(long)]
    id: i64,
    #[clap(long, value_enum)]
    field: TamperField,
    #[clap(long)]
    value: String,
}

fn parse_update(field: TamperField, value: &str) -> Result<FieldUpdate, BarnacleError> {
    match field {
        // Even a tampered record must stay evaluable, so the field
        // invariants hold here too: a blank name/role would make the next
        // audit reject the record instead of classifying it.
        TamperField::Name => {
            if value.trim().is_empty() {
                return Err(BarnacleError::ValidationError(
                    "name value must not be empty".to_string(),
                ));
            }
            Ok(FieldUpdate::Name(value.to_string()))
        }
        TamperField::Role => {
            if value.trim().is_empty() {
                return Err(BarnacleError::ValidationError(
                    "role value must not be empty".to_string(),
                ));
            }
            Ok(FieldUpdate::Role(value.to_string()))
        }
        TamperField::Salary => {
            let salary: i64 = value.parse().map_err(|_| {
                BarnacleError::ValidationError(format!(
                    "salary value must be an integer, got '{}'",
                    value
                ))
            })?;
            if salary < 0 {
                return Err(BarnacleError::ValidationError(format!(
                    "salary value must be non-negative, got {}",
                    salary
                )));
            }
            Ok(FieldUpdate::Salary(salary))
        }
    }
}

/// Rewrite one field in place, deliberately leaving `stored_hash` stale. This
/// is the only sanctioned way to make a record's triad diverge.
pub fn tamper_record(
    root: &Path,
    id: i64,
    field: TamperField,
    value: &str,
) -> Result<EmployeeRecord, BarnacleError> {
    let update = parse_update(field, value)?;
    let store = RecordStore::new(root);
    let mutated = store.apply_unhashed_update(id, &update)?;

    roster::record_roster_event(
        root,
        "roster.tamper_simulated",
        Some(id),
        serde_json::json!({
            "field": format!("{:?}", field).to_lowercase(),
            "new_value": value,
            "stored_hash": mutated.stored_hash,
        }),
    )?;
    Ok(mutated)
}

pub fn execute_tamper_cli(root: &Path, cli: &TamperCli) -> Result<(), BarnacleError> {
    let mutated = tamper_record(root, cli.id, cli.field, &cli.value)?;
    println!(
        "Tampered with record {}: {} is now '{}' while the stored hash is unchanged.",
        mutated.id,
        format!("{:?}", cli.field).to_lowercase(),
        cli.value
    );
    println!("Run `barnacle audit record --id {}` to see it flagged.", mutated.id);
    Ok(())
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "tamper",
        "version": "0.1.0",
        "description": "Tamper simulation: field rewrite without rehash",
        "commands": [
            { "name": "tamper", "description": "Rewrite name/role/salary in place" }
        ],
        "events": ["roster.tamper_simulated"],
        "storage": []
    })
}
