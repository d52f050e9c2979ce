use crate::core::error;
use crate::core::time;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// The DB Broker is the "Thin Waist" for inventory mutations.
///
/// Every write runs inside one SQLite transaction: the closure's writes are
/// committed together when it returns `Ok` and rolled back when it returns
/// `Err`. Each brokered operation appends one line to the audit log.
#[derive(Debug, Clone)]
pub struct DbBroker {
    audit_log_path: Option<PathBuf>,
    actor: String,
    db_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BrokerEvent {
    pub ts: String,
    pub event_id: String,
    pub actor: String,
    pub op: String,
    pub db_id: String,
    pub status: String,
}

impl DbBroker {
    pub fn new(db_id: &str, actor: &str, audit_log_path: Option<&Path>) -> Self {
        Self {
            audit_log_path: audit_log_path.map(Path::to_path_buf),
            actor: actor.to_string(),
            db_id: db_id.to_string(),
        }
    }

    pub fn audit_log_path(&self) -> Option<&Path> {
        self.audit_log_path.as_deref()
    }

    /// Run `f` inside a transaction on `conn`, commit on success, roll back on error.
    pub fn with_tx<F, R>(
        &self,
        conn: &mut Connection,
        op_name: &str,
        f: F,
    ) -> Result<R, error::PartbinError>
    where
        F: FnOnce(&Connection) -> Result<R, error::PartbinError>,
    {
        let tx = conn.transaction()?;
        // Dropping an uncommitted transaction rolls it back.
        let result = f(&tx).and_then(|value| {
            tx.commit()?;
            Ok(value)
        });

        let status = match &result {
            Ok(_) => "success",
            Err(e) => {
                tracing::debug!(op = op_name, error = %e, "transaction rolled back");
                "error"
            }
        };
        // The outcome is already decided; an unwritable audit log must not change it.
        if let Err(e) = self.log_event(op_name, status) {
            tracing::warn!(op = op_name, status, error = %e, "audit event not recorded");
        }

        result
    }

    fn log_event(&self, op: &str, status: &str) -> Result<(), error::PartbinError> {
        let Some(path) = &self.audit_log_path else {
            return Ok(());
        };

        let ev = BrokerEvent {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            actor: self.actor.clone(),
            op: op.to_string(),
            db_id: self.db_id.clone(),
            status: status.to_string(),
        };

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(error::PartbinError::IoError)?;

        writeln!(f, "{}", serde_json::to_string(&ev)?).map_err(error::PartbinError::IoError)?;
        Ok(())
    }
}

/// Read every event from an audit log; a missing log reads as empty.
pub fn read_audit_log(path: &Path) -> Result<Vec<BrokerEvent>, error::PartbinError> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    let mut out = Vec::new();
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        out.push(serde_json::from_str(line)?);
    }
    Ok(out)
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "broker",
        "version": "0.1.0",
        "description": "Transactional mutation broker (The Thin Waist)",
        "commands": [
            { "name": "read_audit_log", "description": "One JSON line per brokered write: op, actor, status" }
        ],
        "storage": ["<db stem>.events.jsonl"]
    })
}
