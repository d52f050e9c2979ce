//! Assembly engine: buildability checks and the build-commit transaction.

use crate::core::error::{PartbinError, Shortfall};
use crate::core::store::Store;
use crate::plugins::inventory::{fetch_project, project_components_in};
use crate::plugins::records::{ProjectStatus, RequiredComponent};
use rusqlite::{params, Connection};
use serde::Serialize;

/// Outcome of comparing a project's requirements with current stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Buildability {
    pub satisfied: bool,
    pub shortfalls: Vec<Shortfall>,
}

fn shortfalls_of(required: &[RequiredComponent]) -> Vec<Shortfall> {
    required
        .iter()
        .filter(|c| !c.is_satisfied())
        .map(|c| Shortfall {
            component_id: c.component_id,
            name: c.name.clone(),
            required: c.required,
            available: c.available,
        })
        .collect()
}

fn check_in(conn: &Connection, project_id: i64) -> Result<Buildability, PartbinError> {
    let required = project_components_in(conn, project_id)?;
    let shortfalls = shortfalls_of(&required);
    Ok(Buildability {
        satisfied: shortfalls.is_empty(),
        shortfalls,
    })
}

/// Read-only check of every requirement against stock.
///
/// A project with no links, or an unknown project id, is trivially buildable.
pub fn can_build(store: &Store, project_id: i64) -> Result<Buildability, PartbinError> {
    check_in(store.conn(), project_id)
}

/// Deduct every required quantity and mark the project completed.
///
/// Returns `Ok(false)` for an unknown project. An archived project is refused
/// with [`PartbinError::ValidationError`]. Any shortfall aborts with
/// [`PartbinError::InsufficientStock`] before anything is written; a failure
/// during deduction rolls back the deductions already made.
pub fn build_project(store: &mut Store, project_id: i64) -> Result<bool, PartbinError> {
    store.write("project.build", |conn| {
        let Some(project) = fetch_project(conn, project_id)? else {
            return Ok(false);
        };
        if project.status == ProjectStatus::Archived {
            return Err(PartbinError::ValidationError(format!(
                "project {} is archived and cannot be built",
                project_id
            )));
        }
        if project.status == ProjectStatus::Completed {
            tracing::warn!(project_id, name = %project.name, "rebuilding a completed project deducts stock again");
        }

        let required = project_components_in(conn, project_id)?;
        let shortfalls = shortfalls_of(&required);
        if !shortfalls.is_empty() {
            return Err(PartbinError::InsufficientStock {
                project_id,
                shortfalls,
            });
        }

        for component in &required {
            // Guarded so stock can never go negative even if it moved since the check.
            let changed = conn.execute(
                "UPDATE components SET quantity = quantity - ?1 WHERE id = ?2 AND quantity >= ?1",
                params![component.required, component.component_id],
            )?;
            if changed != 1 {
                return Err(PartbinError::InsufficientStock {
                    project_id,
                    shortfalls: vec![Shortfall {
                        component_id: component.component_id,
                        name: component.name.clone(),
                        required: component.required,
                        available: component.available,
                    }],
                });
            }
        }

        conn.execute(
            "UPDATE projects SET status = ?1 WHERE id = ?2",
            params![ProjectStatus::Completed, project_id],
        )?;
        tracing::info!(project_id, components = required.len(), "project built");
        Ok(true)
    })
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "assembly",
        "version": "0.1.0",
        "description": "Buildability checks and atomic build-commit",
        "commands": [
            { "name": "check", "parameters": ["project"] },
            { "name": "build", "parameters": ["project"] }
        ],
        "storage": []
    })
}
