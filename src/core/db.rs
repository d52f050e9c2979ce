use crate::core::error;
use crate::core::schemas;
use rusqlite::{Connection, OptionalExtension};
use std::fs;
use std::path::Path;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn db_connect(db_path: &Path) -> Result<Connection, error::PartbinError> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(error::PartbinError::IoError)?;
        }
    }
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(error::PartbinError::RusqliteError)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(error::PartbinError::RusqliteError)?;
    conn.execute("PRAGMA foreign_keys=ON;", [])
        .map_err(error::PartbinError::RusqliteError)?;
    Ok(conn)
}

pub fn db_connect_in_memory() -> Result<Connection, error::PartbinError> {
    let conn = Connection::open_in_memory()?;
    conn.execute("PRAGMA foreign_keys=ON;", [])
        .map_err(error::PartbinError::RusqliteError)?;
    Ok(conn)
}

pub fn schema_version(conn: &Connection) -> Result<u32, error::PartbinError> {
    conn.execute(schemas::DB_SCHEMA_META, [])?;
    let current: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(error::PartbinError::RusqliteError)?;

    Ok(current
        .as_deref()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(0))
}

/// Create tables, indexes and views if missing and record the schema version.
pub fn ensure_schema(conn: &Connection) -> Result<(), error::PartbinError> {
    let current_version = schema_version(conn)?;
    if current_version >= schemas::SCHEMA_VERSION {
        return Ok(());
    }

    // A database written by an older tool may already hold these tables; every
    // statement is IF NOT EXISTS so they are adopted as they are.
    conn.execute(schemas::DB_SCHEMA_COMPONENTS, [])?;
    conn.execute(schemas::DB_SCHEMA_PROJECTS, [])?;
    conn.execute(schemas::DB_SCHEMA_PROJECT_COMPONENTS, [])?;
    conn.execute(schemas::DB_SCHEMA_INDEX_COMPONENTS_TYPE, [])?;
    conn.execute(schemas::DB_SCHEMA_INDEX_COMPONENTS_LOCATION, [])?;
    conn.execute(schemas::DB_SCHEMA_INDEX_PROJECT_COMPONENTS, [])?;
    conn.execute(schemas::DB_SCHEMA_INDEX_COMPONENT_LINKS, [])?;
    conn.execute(schemas::DB_SCHEMA_VIEW_COMPONENTS_WITH_PROJECTS, [])?;

    conn.execute(
        "INSERT INTO meta(key, value) VALUES('schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [schemas::SCHEMA_VERSION.to_string()],
    )?;
    tracing::debug!(
        from = current_version,
        to = schemas::SCHEMA_VERSION,
        "inventory schema initialized"
    );
    Ok(())
}
