//! Store handle for the inventory database.
//!
//! A `Store` owns the one SQLite connection of a session. Every inventory,
//! assembly and reporting operation receives it explicitly: `&Store` for
//! reads, `&mut Store` for brokered writes.

use crate::core::broker::DbBroker;
use crate::core::config::Config;
use crate::core::db;
use crate::core::error::PartbinError;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Where a store's data lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreKind {
    /// File-backed database at the given path.
    File(PathBuf),
    /// Private in-memory database, gone when the store closes.
    Memory,
}

pub struct Store {
    pub kind: StoreKind,
    conn: Connection,
    broker: DbBroker,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("kind", &self.kind)
            .field("broker", &self.broker)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Open (creating if needed) a file-backed store with an optional audit log.
    pub fn open(
        db_path: &Path,
        actor: &str,
        audit_log_path: Option<&Path>,
    ) -> Result<Self, PartbinError> {
        let conn = db::db_connect(db_path)?;
        db::ensure_schema(&conn)?;
        let db_id = db_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        tracing::info!(db = %db_path.display(), "inventory store opened");
        Ok(Self {
            kind: StoreKind::File(db_path.to_path_buf()),
            conn,
            broker: DbBroker::new(&db_id, actor, audit_log_path),
        })
    }

    pub fn open_with_config(config: &Config) -> Result<Self, PartbinError> {
        let audit = config.audit_log_path();
        Self::open(&config.database.path, &config.audit.actor, audit.as_deref())
    }

    /// In-memory store without an audit log.
    pub fn open_in_memory() -> Result<Self, PartbinError> {
        let conn = db::db_connect_in_memory()?;
        db::ensure_schema(&conn)?;
        Ok(Self {
            kind: StoreKind::Memory,
            conn,
            broker: DbBroker::new(":memory:", "partbin", None),
        })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn broker(&self) -> &DbBroker {
        &self.broker
    }

    /// Run a brokered, all-or-nothing write.
    pub fn write<F, R>(&mut self, op_name: &str, f: F) -> Result<R, PartbinError>
    where
        F: FnOnce(&Connection) -> Result<R, PartbinError>,
    {
        self.broker.with_tx(&mut self.conn, op_name, f)
    }

    /// Release the connection, surfacing any error SQLite reports on close.
    pub fn close(self) -> Result<(), PartbinError> {
        self.conn
            .close()
            .map_err(|(_, e)| PartbinError::RusqliteError(e))?;
        tracing::info!("inventory store closed");
        Ok(())
    }
}
