use crate::core::broker::DbBroker;
use crate::core::error;
use crate::core::schemas;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

pub fn db_connect(db_path: &str) -> Result<Connection, error::BarnacleError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(error::BarnacleError::RusqliteError)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(error::BarnacleError::RusqliteError)?;
    conn.execute("PRAGMA foreign_keys=ON;", [])
        .map_err(error::BarnacleError::RusqliteError)?;
    Ok(conn)
}

pub fn registry_db_path(root: &Path) -> PathBuf {
    root.join(schemas::REGISTRY_DB_NAME)
}

pub fn initialize_registry_db(root: &Path) -> Result<(), error::BarnacleError> {
    let db_path = registry_db_path(root);
    let parent_dir = db_path.parent().ok_or_else(|| {
        error::BarnacleError::DatabaseInitializationError(format!(
            "registry path has no parent directory: {}",
            db_path.display()
        ))
    })?;
    fs::create_dir_all(parent_dir).map_err(error::BarnacleError::IoError)?;

    let broker = DbBroker::new(root);
    broker.with_conn(&db_path, "barnacle", None, "registry.init", |conn| {
        conn.execute(schemas::REGISTRY_DB_SCHEMA_EMPLOYEES, [])?;
        conn.execute(schemas::REGISTRY_DB_SCHEMA_EMPLOYEES_NAME_INDEX, [])?;
        conn.execute(schemas::REGISTRY_DB_SCHEMA_META, [])?;
        Ok(())
    })?;

    Ok(())
}
