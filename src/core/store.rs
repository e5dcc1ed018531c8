//! SQLite-backed record store.
//!
//! The store owns EmployeeRecord persistence and nothing else: hashing,
//! anchoring, and verification live above it. Every operation routes through
//! the `DbBroker` so the audit trail sees each access.

use crate::core::broker::DbBroker;
use crate::core::db;
use crate::core::error::{BarnacleError, ConflictKind};
use crate::core::record::{ConflictRecord, EmployeeRecord, FieldUpdate};
use rusqlite::{OptionalExtension, Row};
use std::path::{Path, PathBuf};

const ID_COUNTER_KEY: &str = "id_counter";

/// Optional filters for record search; all present filters must match.
#[derive(Debug, Default, Clone)]
pub struct RecordFilter {
    pub name: Option<String>,
    pub role: Option<String>,
    pub min_salary: Option<i64>,
    pub max_salary: Option<i64>,
}

pub struct RecordStore {
    root: PathBuf,
}

fn row_to_record(row: &Row) -> rusqlite::Result<EmployeeRecord> {
    Ok(EmployeeRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        role: row.get(2)?,
        salary: row.get(3)?,
        created_at: row.get(4)?,
        stored_hash: row.get(5)?,
        ledger_hash: row.get(6)?,
    })
}

const RECORD_COLUMNS: &str = "id, name, role, salary, created_at, stored_hash, ledger_hash";

impl RecordStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        db::registry_db_path(&self.root)
    }

    /// The registry must exist before any operation; a missing database is an
    /// availability failure, not a query error.
    fn guard(&self) -> Result<PathBuf, BarnacleError> {
        let db_path = self.db_path();
        if !db_path.exists() {
            return Err(BarnacleError::StoreUnavailable(format!(
                "registry database not found at {} (run `barnacle init` first)",
                db_path.display()
            )));
        }
        Ok(db_path)
    }

    pub fn get(&self, id: i64) -> Result<Option<EmployeeRecord>, BarnacleError> {
        let db_path = self.guard()?;
        let broker = DbBroker::new(&self.root);
        broker.with_conn(&db_path, "barnacle", None, "registry.get", |conn| {
            let record = conn
                .query_row(
                    &format!("SELECT {} FROM employees WHERE id = ?1", RECORD_COLUMNS),
                    rusqlite::params![id],
                    row_to_record,
                )
                .optional()?;
            Ok(record)
        })
    }

    /// All records in ascending-id order. The stable order is what makes
    /// sampled verification deterministic across repeated calls.
    pub fn get_all(&self) -> Result<Vec<EmployeeRecord>, BarnacleError> {
        let db_path = self.guard()?;
        let broker = DbBroker::new(&self.root);
        broker.with_conn(&db_path, "barnacle", None, "registry.get_all", |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM employees ORDER BY id",
                RECORD_COLUMNS
            ))?;
            let rows = stmt.query_map([], row_to_record)?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    pub fn search(&self, filter: &RecordFilter) -> Result<Vec<EmployeeRecord>, BarnacleError> {
        let db_path = self.guard()?;
        let broker = DbBroker::new(&self.root);
        broker.with_conn(&db_path, "barnacle", None, "registry.search", |conn| {
            let mut query = format!("SELECT {} FROM employees WHERE 1=1", RECORD_COLUMNS);
            let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

            if let Some(name) = &filter.name {
                // LIKE is already case-insensitive for ASCII in SQLite.
                query.push_str(" AND name LIKE ?");
                params.push(Box::new(format!("%{}%", name)));
            }
            if let Some(role) = &filter.role {
                query.push_str(" AND role LIKE ?");
                params.push(Box::new(format!("%{}%", role)));
            }
            if let Some(min) = filter.min_salary {
                query.push_str(" AND salary >= ?");
                params.push(Box::new(min));
            }
            if let Some(max) = filter.max_salary {
                query.push_str(" AND salary <= ?");
                params.push(Box::new(max));
            }
            query.push_str(" ORDER BY id");

            let mut stmt = conn.prepare(&query)?;
            let rows = stmt.query_map(
                rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
                row_to_record,
            )?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    /// Every record that shares the candidate name, case-insensitively.
    pub fn find_by_name(&self, name: &str) -> Result<Vec<ConflictRecord>, BarnacleError> {
        let db_path = self.guard()?;
        let broker = DbBroker::new(&self.root);
        broker.with_conn(&db_path, "barnacle", None, "registry.find_by_name", |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, role FROM employees WHERE name = ?1 COLLATE NOCASE ORDER BY id",
            )?;
            let rows = stmt.query_map(rusqlite::params![name], |row| {
                Ok(ConflictRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    role: row.get(2)?,
                })
            })?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    pub fn put(&self, record: &EmployeeRecord) -> Result<(), BarnacleError> {
        let db_path = self.guard()?;
        let broker = DbBroker::new(&self.root);
        broker.with_conn(&db_path, "barnacle", None, "registry.put", |conn| {
            let inserted = conn.execute(
                "INSERT INTO employees(id, name, role, salary, created_at, stored_hash, ledger_hash)
                 VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    record.id,
                    record.name,
                    record.role,
                    record.salary,
                    record.created_at,
                    record.stored_hash,
                    record.ledger_hash
                ],
            );
            match inserted {
                Ok(_) => {}
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    return Err(BarnacleError::Conflict(ConflictKind::IdCollision(record.id)));
                }
                Err(e) => return Err(BarnacleError::RusqliteError(e)),
            }

            // Track the highest assigned id so next_id() stays monotonic.
            let counter = read_id_counter(conn)?;
            if record.id > counter {
                write_id_counter(conn, record.id)?;
            }
            Ok(())
        })
    }

    /// Tamper-simulation path: rewrites one field and deliberately leaves
    /// `stored_hash` untouched.
    pub fn apply_unhashed_update(
        &self,
        id: i64,
        update: &FieldUpdate,
    ) -> Result<EmployeeRecord, BarnacleError> {
        let db_path = self.guard()?;
        let broker = DbBroker::new(&self.root);
        broker.with_conn(&db_path, "barnacle", None, "registry.unhashed_update", |conn| {
            let changed = match update {
                FieldUpdate::Name(value) => conn.execute(
                    "UPDATE employees SET name = ?1 WHERE id = ?2",
                    rusqlite::params![value, id],
                )?,
                FieldUpdate::Role(value) => conn.execute(
                    "UPDATE employees SET role = ?1 WHERE id = ?2",
                    rusqlite::params![value, id],
                )?,
                FieldUpdate::Salary(value) => conn.execute(
                    "UPDATE employees SET salary = ?1 WHERE id = ?2",
                    rusqlite::params![value, id],
                )?,
            };
            if changed == 0 {
                return Err(BarnacleError::NotFound(format!("employee id {}", id)));
            }
            let record = conn.query_row(
                &format!("SELECT {} FROM employees WHERE id = ?1", RECORD_COLUMNS),
                rusqlite::params![id],
                row_to_record,
            )?;
            Ok(record)
        })
    }

    /// Anchor-completion path: fills in the ledger hash once the anchoring
    /// service confirms it.
    pub fn set_ledger_hash(&self, id: i64, ledger_hash: &str) -> Result<(), BarnacleError> {
        let db_path = self.guard()?;
        let broker = DbBroker::new(&self.root);
        broker.with_conn(&db_path, "barnacle", None, "registry.set_ledger_hash", |conn| {
            let changed = conn.execute(
                "UPDATE employees SET ledger_hash = ?1 WHERE id = ?2",
                rusqlite::params![ledger_hash, id],
            )?;
            if changed == 0 {
                return Err(BarnacleError::NotFound(format!("employee id {}", id)));
            }
            Ok(())
        })
    }

    /// Records whose anchor has not been confirmed yet, as (id, stored_hash).
    pub fn pending_anchors(&self) -> Result<Vec<(i64, String)>, BarnacleError> {
        let db_path = self.guard()?;
        let broker = DbBroker::new(&self.root);
        broker.with_conn(&db_path, "barnacle", None, "registry.pending_anchors", |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, stored_hash FROM employees WHERE ledger_hash IS NULL ORDER BY id",
            )?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
    }

    /// Returns true when a row was actually removed.
    pub fn delete(&self, id: i64) -> Result<bool, BarnacleError> {
        let db_path = self.guard()?;
        let broker = DbBroker::new(&self.root);
        broker.with_conn(&db_path, "barnacle", None, "registry.delete", |conn| {
            let changed = conn.execute(
                "DELETE FROM employees WHERE id = ?1",
                rusqlite::params![id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Removes every record and resets the id counter. Ledger history is
    /// deliberately untouched.
    pub fn delete_all(&self) -> Result<usize, BarnacleError> {
        let db_path = self.guard()?;
        let broker = DbBroker::new(&self.root);
        broker.with_conn(&db_path, "barnacle", None, "registry.delete_all", |conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM employees", [], |row| row.get(0))?;
            conn.execute("DELETE FROM employees", [])?;
            write_id_counter(conn, 0)?;
            Ok(count as usize)
        })
    }

    pub fn count(&self) -> Result<usize, BarnacleError> {
        let db_path = self.guard()?;
        let broker = DbBroker::new(&self.root);
        broker.with_conn(&db_path, "barnacle", None, "registry.count", |conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM employees", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    /// Next free id suggestion. Ids are externally assigned; this is only a
    /// convenience default that survives deletions of lower ids.
    pub fn next_id(&self) -> Result<i64, BarnacleError> {
        let db_path = self.guard()?;
        let broker = DbBroker::new(&self.root);
        broker.with_conn(&db_path, "barnacle", None, "registry.next_id", |conn| {
            Ok(read_id_counter(conn)? + 1)
        })
    }
}

fn read_id_counter(conn: &rusqlite::Connection) -> Result<i64, BarnacleError> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = ?1",
            rusqlite::params![ID_COUNTER_KEY],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value.and_then(|v| v.parse::<i64>().ok()).unwrap_or(0))
}

fn write_id_counter(conn: &rusqlite::Connection, value: i64) -> Result<(), BarnacleError> {
    conn.execute(
        "INSERT INTO meta(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        rusqlite::params![ID_COUNTER_KEY, value.to_string()],
    )?;
    Ok(())
}
