use serde::Serialize;
use std::fmt;
use std::io;
use thiserror::Error;

/// A project that references a component, carried by [`PartbinError::InUse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRef {
    pub id: i64,
    pub name: String,
}

/// One component a project needs more of than is in stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shortfall {
    pub component_id: i64,
    pub name: String,
    pub required: i64,
    pub available: i64,
}

impl Shortfall {
    pub fn missing(&self) -> i64 {
        self.required - self.available
    }
}

impl fmt::Display for Shortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (needed: {}, available: {})",
            self.name, self.required, self.available
        )
    }
}

#[derive(Error, Debug)]
pub enum PartbinError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error(
        "Component {component_id} is used in {} project(s): {}",
        projects.len(),
        join_projects(projects)
    )]
    InUse {
        component_id: i64,
        projects: Vec<ProjectRef>,
    },
    #[error("Invalid quantity: {0} (must be positive)")]
    InvalidQuantity(i64),
    #[error(
        "Insufficient stock to build project {project_id}: {}",
        join_shortfalls(shortfalls)
    )]
    InsufficientStock {
        project_id: i64,
        shortfalls: Vec<Shortfall>,
    },
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
    #[error("Config error: {0}")]
    ConfigError(String),
}

impl PartbinError {
    /// Stable machine-readable code used in JSON envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            PartbinError::RusqliteError(_) => "DB_ERROR",
            PartbinError::IoError(_) => "IO_ERROR",
            PartbinError::JsonError(_) => "JSON_ERROR",
            PartbinError::ValidationError(_) => "VALIDATION_ERROR",
            PartbinError::NotFound(_) => "NOT_FOUND",
            PartbinError::InUse { .. } => "IN_USE",
            PartbinError::InvalidQuantity(_) => "INVALID_QUANTITY",
            PartbinError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            PartbinError::DuplicateKey(_) => "DUPLICATE_KEY",
            PartbinError::ConfigError(_) => "CONFIG_ERROR",
        }
    }
}

fn join_projects(projects: &[ProjectRef]) -> String {
    projects
        .iter()
        .map(|p| format!("[{}] {}", p.id, p.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_shortfalls(shortfalls: &[Shortfall]) -> String {
    shortfalls
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// True for SQLite `CHECK`, `UNIQUE`, `FOREIGN KEY` and `NOT NULL` failures.
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// True only for `UNIQUE` / `PRIMARY KEY` failures.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}
