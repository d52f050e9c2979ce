//! Derived, read-only views over the inventory.

use crate::core::config::DEFAULT_LOW_STOCK_THRESHOLD;
use crate::core::error::PartbinError;
use crate::core::store::Store;
use crate::plugins::assembly;
use crate::plugins::inventory;
use crate::plugins::records::{Component, ProjectStatus, RequiredComponent};
use serde::Serialize;

pub const ALL_AVAILABLE: &str = "Build possible: all components are available.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    pub id: i64,
    pub name: String,
    pub status: ProjectStatus,
    pub components: Vec<RequiredComponent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentInfo {
    pub id: i64,
    pub name: String,
    pub manufacturer: String,
    pub store_links: String,
}

/// Components with `quantity < threshold` (strict), in store order.
pub fn low_stock(store: &Store, threshold: Option<i64>) -> Result<Vec<Component>, PartbinError> {
    let threshold = threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    Ok(inventory::list_components(store)?
        .into_iter()
        .filter(|c| c.quantity < threshold)
        .collect())
}

pub fn project_summary(
    store: &Store,
    project_id: i64,
) -> Result<Option<ProjectSummary>, PartbinError> {
    let Some(project) = inventory::get_project(store, project_id)? else {
        return Ok(None);
    };
    Ok(Some(ProjectSummary {
        id: project.id,
        name: project.name,
        status: project.status,
        components: inventory::get_project_components(store, project_id)?,
    }))
}

/// Human-readable buildability lines: one per shortfall, or a single
/// all-clear line.
pub fn explain(check: &assembly::Buildability) -> Vec<String> {
    if check.satisfied {
        return vec![ALL_AVAILABLE.to_string()];
    }
    check.shortfalls.iter().map(|s| s.to_string()).collect()
}

pub fn explain_buildability(store: &Store, project_id: i64) -> Result<Vec<String>, PartbinError> {
    Ok(explain(&assembly::can_build(store, project_id)?))
}

pub fn component_info(store: &Store, id: i64) -> Result<Option<ComponentInfo>, PartbinError> {
    Ok(inventory::get_component(store, id)?.map(|c| ComponentInfo {
        id: c.id,
        name: c.name,
        manufacturer: c.manufacturer,
        store_links: c.store_links,
    }))
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "reports",
        "version": "0.1.0",
        "description": "Low-stock listing, project summaries and buildability explanations",
        "commands": [
            { "name": "low", "parameters": ["threshold"] },
            { "name": "summary", "parameters": ["project"] },
            { "name": "check", "parameters": ["project"] },
            { "name": "info", "parameters": ["id"] }
        ],
        "storage": []
    })
}
