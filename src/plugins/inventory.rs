//! Inventory store: components, projects and the links between them.
//!
//! All writes go through [`Store::write`], so each public mutation is one
//! transaction and leaves uniqueness and referential rules intact.

use crate::core::error::{self, PartbinError, ProjectRef};
use crate::core::schemas;
use crate::core::store::Store;
use crate::plugins::records::{
    Component, FieldUpdate, FilterValue, NewComponent, Project, ProjectComponent,
    RequiredComponent, SearchFilter,
};
use rusqlite::{params, types::ToSql, Connection, OptionalExtension, Row};

fn row_to_component(row: &Row<'_>) -> rusqlite::Result<Component> {
    Ok(Component {
        id: row.get(0)?,
        r#type: row.get(1)?,
        name: row.get(2)?,
        quantity: row.get(3)?,
        package: row.get(4)?,
        comment: row.get(5)?,
        manufacturer: row.get(6)?,
        store_links: row.get(7)?,
        location: row.get(8)?,
        tags: row.get(9)?,
        projects: row.get(10)?,
    })
}

fn row_to_project(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
        status: row.get(4)?,
    })
}

pub(crate) fn fetch_component(
    conn: &Connection,
    id: i64,
) -> Result<Option<Component>, PartbinError> {
    let sql = format!(
        "SELECT {} FROM components_with_projects WHERE id = ?1",
        schemas::COMPONENT_COLUMNS
    );
    Ok(conn
        .query_row(&sql, params![id], row_to_component)
        .optional()?)
}

pub(crate) fn fetch_project(conn: &Connection, id: i64) -> Result<Option<Project>, PartbinError> {
    let sql = format!(
        "SELECT {} FROM projects WHERE id = ?1",
        schemas::PROJECT_COLUMNS
    );
    Ok(conn.query_row(&sql, params![id], row_to_project).optional()?)
}

fn linked_projects(conn: &Connection, component_id: i64) -> Result<Vec<ProjectRef>, PartbinError> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.name FROM project_components pc
         JOIN projects p ON pc.project_id = p.id
         WHERE pc.component_id = ?1
         ORDER BY p.id",
    )?;
    let rows = stmt.query_map(params![component_id], |row| {
        Ok(ProjectRef {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub(crate) fn project_components_in(
    conn: &Connection,
    project_id: i64,
) -> Result<Vec<RequiredComponent>, PartbinError> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.type, c.name, pc.quantity, c.quantity,
                COALESCE(c.package, ''), c.location
         FROM project_components pc
         JOIN components c ON pc.component_id = c.id
         WHERE pc.project_id = ?1
         ORDER BY pc.rowid",
    )?;
    let rows = stmt.query_map(params![project_id], |row| {
        Ok(RequiredComponent {
            component_id: row.get(0)?,
            r#type: row.get(1)?,
            name: row.get(2)?,
            required: row.get(3)?,
            available: row.get(4)?,
            package: row.get(5)?,
            location: row.get(6)?,
        })
    })?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

fn natural_key_conflict(e: rusqlite::Error, what: String) -> PartbinError {
    if error::is_unique_violation(&e) {
        PartbinError::DuplicateKey(what)
    } else {
        PartbinError::RusqliteError(e)
    }
}

/// Add stock. A component with the same (type, name, package) absorbs the
/// quantity instead of getting a second row. Returns the component id.
pub fn add_component(store: &mut Store, candidate: &NewComponent) -> Result<i64, PartbinError> {
    candidate.validate()?;

    store.write("inventory.add_component", |conn| {
        let existing: Option<(i64, i64)> = conn
            .query_row(
                "SELECT id, quantity FROM components WHERE type = ?1 AND name = ?2 AND package = ?3",
                params![candidate.r#type, candidate.name, candidate.package],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        if let Some((id, quantity)) = existing {
            let merged = quantity.checked_add(candidate.quantity).ok_or_else(|| {
                PartbinError::ValidationError(format!(
                    "quantity overflow merging {} into component {}",
                    candidate.quantity, id
                ))
            })?;
            conn.execute(
                "UPDATE components SET quantity = ?1 WHERE id = ?2",
                params![merged, id],
            )?;
            tracing::debug!(component_id = id, added = candidate.quantity, total = merged, "merged duplicate component");
            return Ok(id);
        }

        conn.execute(
            "INSERT INTO components(type, name, quantity, package, comment, manufacturer, store_links, location, tags)
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                candidate.r#type,
                candidate.name,
                candidate.quantity,
                candidate.package,
                candidate.comment,
                candidate.manufacturer,
                candidate.store_links,
                candidate.location,
                candidate.tags
            ],
        )?;
        let id = conn.last_insert_rowid();
        tracing::debug!(component_id = id, "inserted component");
        Ok(id)
    })
}

pub fn get_component(store: &Store, id: i64) -> Result<Option<Component>, PartbinError> {
    fetch_component(store.conn(), id)
}

/// Replace every writable field of the component with the given id.
///
/// `projects` is derived from links and is ignored here.
pub fn update_component(store: &mut Store, component: &Component) -> Result<bool, PartbinError> {
    component.validate()?;

    store.write("inventory.update_component", |conn| {
        let changed = conn
            .execute(
                "UPDATE components SET
                    type = ?1, name = ?2, quantity = ?3, package = ?4, comment = ?5,
                    manufacturer = ?6, store_links = ?7, location = ?8, tags = ?9
                 WHERE id = ?10",
                params![
                    component.r#type,
                    component.name,
                    component.quantity,
                    component.package,
                    component.comment,
                    component.manufacturer,
                    component.store_links,
                    component.location,
                    component.tags,
                    component.id
                ],
            )
            .map_err(|e| {
                natural_key_conflict(
                    e,
                    format!(
                        "component ({}, {}, {}) already exists",
                        component.r#type, component.name, component.package
                    ),
                )
            })?;
        if changed == 0 {
            return Err(PartbinError::NotFound(format!("component {}", component.id)));
        }
        Ok(true)
    })
}

/// Apply a single typed field change and return the updated component.
pub fn update_component_field(
    store: &mut Store,
    id: i64,
    update: &FieldUpdate,
) -> Result<Component, PartbinError> {
    let mut component = get_component(store, id)?
        .ok_or_else(|| PartbinError::NotFound(format!("component {}", id)))?;
    update.apply(&mut component);
    update_component(store, &component)?;
    tracing::debug!(component_id = id, field = %update.field(), "updated component field");
    Ok(component)
}

fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('%');
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}

/// Filtered listing in insertion order. Filters are ANDed; none returns everything.
pub fn search_components(
    store: &Store,
    filters: &[SearchFilter],
) -> Result<Vec<Component>, PartbinError> {
    let mut query = format!(
        "SELECT {} FROM components_with_projects WHERE 1=1",
        schemas::COMPONENT_COLUMNS
    );
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();

    for filter in filters {
        let column = filter.field.as_str();
        match &filter.value {
            FilterValue::Text(text) => {
                query.push_str(&format!(" AND \"{}\" LIKE ? ESCAPE '\\'", column));
                params.push(Box::new(escape_like(text)));
            }
            FilterValue::Integer(n) => {
                query.push_str(&format!(" AND \"{}\" = ?", column));
                params.push(Box::new(*n));
            }
        }
    }
    query.push_str(" ORDER BY id");

    let mut stmt = store.conn().prepare(&query)?;
    let rows = stmt.query_map(
        rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
        row_to_component,
    )?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn list_components(store: &Store) -> Result<Vec<Component>, PartbinError> {
    search_components(store, &[])
}

pub fn projects_using_component(
    store: &Store,
    component_id: i64,
) -> Result<Vec<ProjectRef>, PartbinError> {
    linked_projects(store.conn(), component_id)
}

/// Delete a component.
///
/// Without `force`, a component still linked to projects is refused with
/// [`PartbinError::InUse`] and nothing changes. With `force`, its links and
/// the row go together. Returns the projects it was unlinked from.
pub fn delete_component(
    store: &mut Store,
    component_id: i64,
    force: bool,
) -> Result<Vec<ProjectRef>, PartbinError> {
    store.write("inventory.delete_component", |conn| {
        if fetch_component(conn, component_id)?.is_none() {
            return Err(PartbinError::NotFound(format!("component {}", component_id)));
        }

        let projects = linked_projects(conn, component_id)?;
        if !projects.is_empty() && !force {
            return Err(PartbinError::InUse {
                component_id,
                projects,
            });
        }

        let unlinked = conn.execute(
            "DELETE FROM project_components WHERE component_id = ?1",
            params![component_id],
        )?;
        conn.execute("DELETE FROM components WHERE id = ?1", params![component_id])?;
        if unlinked > 0 {
            tracing::info!(component_id, links = unlinked, "force-deleted component with project links");
        }
        Ok(projects)
    })
}

/// Create a project, or return the id of the existing project with that name.
pub fn create_project(
    store: &mut Store,
    name: &str,
    description: &str,
) -> Result<i64, PartbinError> {
    if name.trim().is_empty() {
        return Err(PartbinError::ValidationError(
            "project name is required".to_string(),
        ));
    }

    store.write("project.create", |conn| {
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM projects WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        conn.execute(
            "INSERT INTO projects(name, description) VALUES(?1, ?2)",
            params![name, description],
        )
        .map_err(|e| natural_key_conflict(e, format!("project '{}' already exists", name)))?;
        Ok(conn.last_insert_rowid())
    })
}

pub fn get_project(store: &Store, id: i64) -> Result<Option<Project>, PartbinError> {
    fetch_project(store.conn(), id)
}

pub fn list_projects(store: &Store) -> Result<Vec<Project>, PartbinError> {
    let sql = format!(
        "SELECT {} FROM projects ORDER BY id",
        schemas::PROJECT_COLUMNS
    );
    let mut stmt = store.conn().prepare(&sql)?;
    let rows = stmt.query_map([], row_to_project)?;
    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Delete a project; its component links cascade with it.
pub fn delete_project(store: &mut Store, project_id: i64) -> Result<(), PartbinError> {
    store.write("project.delete", |conn| {
        let changed = conn.execute("DELETE FROM projects WHERE id = ?1", params![project_id])?;
        if changed == 0 {
            return Err(PartbinError::NotFound(format!("project {}", project_id)));
        }
        Ok(())
    })
}

pub fn archive_project(store: &mut Store, project_id: i64) -> Result<(), PartbinError> {
    store.write("project.archive", |conn| {
        let changed = conn.execute(
            "UPDATE projects SET status = 'archived' WHERE id = ?1",
            params![project_id],
        )?;
        if changed == 0 {
            return Err(PartbinError::NotFound(format!("project {}", project_id)));
        }
        Ok(())
    })
}

/// Require `quantity` units of a component for a project, replacing any
/// earlier requirement for the same pair.
///
/// Returns `Ok(false)` when the link is refused by a database constraint
/// (for example an unknown project id); the transaction is rolled back.
pub fn add_component_to_project(
    store: &mut Store,
    project_id: i64,
    component_id: i64,
    quantity: i64,
) -> Result<bool, PartbinError> {
    let result = store.write("project.add_component", |conn| {
        if fetch_component(conn, component_id)?.is_none() {
            return Err(PartbinError::NotFound(format!("component {}", component_id)));
        }
        let link = ProjectComponent::new(project_id, component_id, quantity)?;

        conn.execute(
            "INSERT INTO project_components(project_id, component_id, quantity)
             VALUES(?1, ?2, ?3)
             ON CONFLICT(project_id, component_id) DO UPDATE SET quantity = excluded.quantity",
            params![link.project_id, link.component_id, link.quantity],
        )?;
        Ok(())
    });

    match result {
        Ok(()) => Ok(true),
        Err(PartbinError::RusqliteError(e)) if error::is_constraint_violation(&e) => {
            tracing::warn!(project_id, component_id, error = %e, "project link rejected");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Drop a component from a project. Returns whether a link existed.
pub fn remove_component_from_project(
    store: &mut Store,
    project_id: i64,
    component_id: i64,
) -> Result<bool, PartbinError> {
    store.write("project.remove_component", |conn| {
        let removed = conn.execute(
            "DELETE FROM project_components WHERE project_id = ?1 AND component_id = ?2",
            params![project_id, component_id],
        )?;
        Ok(removed > 0)
    })
}

/// The project's bill of materials with current stock, in link insertion order.
pub fn get_project_components(
    store: &Store,
    project_id: i64,
) -> Result<Vec<RequiredComponent>, PartbinError> {
    project_components_in(store.conn(), project_id)
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "inventory",
        "version": "0.1.0",
        "description": "Components, projects and project links",
        "commands": [
            { "name": "list", "parameters": [] },
            { "name": "add", "parameters": ["type", "name", "quantity", "location", "package", "comment", "manufacturer", "store_links", "tags"] },
            { "name": "search", "parameters": ["field", "value"] },
            { "name": "update", "parameters": ["id", "field", "value"] },
            { "name": "delete", "parameters": ["id", "force"] },
            { "name": "info", "parameters": ["id"] },
            { "name": "fields", "parameters": [] },
            { "name": "projects", "parameters": [] },
            { "name": "new-project", "parameters": ["name", "desc"] },
            { "name": "del-project", "parameters": ["id", "yes"] },
            { "name": "archive-project", "parameters": ["id"] },
            { "name": "add-to", "parameters": ["project", "component", "qty"] },
            { "name": "remove-from", "parameters": ["project", "component"] },
            { "name": "components", "parameters": ["project"] }
        ],
        "storage": [schemas::DEFAULT_DB_NAME]
    })
}
