//! Centralized database schema definitions for the registry.
//!
//! Barnacle keeps a single SQLite database:
//! registry.db: employee records plus the id-assignment counter.

pub const REGISTRY_DB_NAME: &str = "registry.db";

pub const REGISTRY_DB_SCHEMA_EMPLOYEES: &str = "
    CREATE TABLE IF NOT EXISTS employees (
        id INTEGER PRIMARY KEY CHECK (id > 0),
        name TEXT NOT NULL,
        role TEXT NOT NULL,
        salary INTEGER NOT NULL CHECK (salary >= 0),
        created_at TEXT NOT NULL,
        stored_hash TEXT NOT NULL,
        ledger_hash TEXT
    )
";

pub const REGISTRY_DB_SCHEMA_EMPLOYEES_NAME_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_employees_name ON employees(name COLLATE NOCASE)";

pub const REGISTRY_DB_SCHEMA_META: &str = "
    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
";
