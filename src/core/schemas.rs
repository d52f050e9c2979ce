//! Centralized database schema definitions for the partbin inventory.
//!
//! One SQLite database holds three tables and one derived view:
//! 1. components: stocked part types, unique on (type, name, package).
//! 2. projects: named builds, unique on name.
//! 3. project_components: per-project required quantity of a component.
//! 4. components_with_projects: components joined with their `proj_<id>` tags.

pub const DEFAULT_DB_NAME: &str = "inventory.db";

/// Bump when the table layout changes; `ensure_schema` replays anything newer.
pub const SCHEMA_VERSION: u32 = 1;

pub const DB_SCHEMA_META: &str = "
    CREATE TABLE IF NOT EXISTS meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
";

pub const DB_SCHEMA_COMPONENTS: &str = "
    CREATE TABLE IF NOT EXISTS components (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        type TEXT NOT NULL,
        name TEXT NOT NULL,
        quantity INTEGER NOT NULL CHECK(quantity >= 0),
        package TEXT NOT NULL DEFAULT '',
        comment TEXT NOT NULL DEFAULT '',
        manufacturer TEXT NOT NULL DEFAULT '',
        store_links TEXT NOT NULL DEFAULT '',
        location TEXT NOT NULL,
        tags TEXT NOT NULL DEFAULT '',
        UNIQUE(type, name, package)
    )
";

pub const DB_SCHEMA_PROJECTS: &str = "
    CREATE TABLE IF NOT EXISTS projects (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        description TEXT NOT NULL DEFAULT '',
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        status TEXT NOT NULL DEFAULT 'active' CHECK(status IN ('active', 'completed', 'archived'))
    )
";

pub const DB_SCHEMA_PROJECT_COMPONENTS: &str = "
    CREATE TABLE IF NOT EXISTS project_components (
        project_id INTEGER NOT NULL,
        component_id INTEGER NOT NULL,
        quantity INTEGER NOT NULL CHECK(quantity > 0),
        PRIMARY KEY (project_id, component_id),
        FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE,
        FOREIGN KEY (component_id) REFERENCES components(id) ON DELETE RESTRICT
    )
";

pub const DB_SCHEMA_INDEX_COMPONENTS_TYPE: &str =
    "CREATE INDEX IF NOT EXISTS idx_components_type ON components(type)";
pub const DB_SCHEMA_INDEX_COMPONENTS_LOCATION: &str =
    "CREATE INDEX IF NOT EXISTS idx_components_location ON components(location)";
pub const DB_SCHEMA_INDEX_PROJECT_COMPONENTS: &str =
    "CREATE INDEX IF NOT EXISTS idx_project_components ON project_components(project_id)";
pub const DB_SCHEMA_INDEX_COMPONENT_LINKS: &str =
    "CREATE INDEX IF NOT EXISTS idx_project_components_component ON project_components(component_id)";

// The projects column is never stored; it is derived from the link table so the
// tag string cannot drift from the links it describes.
pub const DB_SCHEMA_VIEW_COMPONENTS_WITH_PROJECTS: &str = "
    CREATE VIEW IF NOT EXISTS components_with_projects AS
    SELECT
        c.id, c.type, c.name, c.quantity,
        COALESCE(c.package, '') AS package,
        COALESCE(c.comment, '') AS comment,
        COALESCE(c.manufacturer, '') AS manufacturer,
        COALESCE(c.store_links, '') AS store_links,
        c.location,
        COALESCE(c.tags, '') AS tags,
        COALESCE((
            SELECT GROUP_CONCAT(tag, ' ') FROM (
                SELECT 'proj_' || pc.project_id AS tag
                FROM project_components pc
                WHERE pc.component_id = c.id
                ORDER BY pc.project_id
            )
        ), '') AS projects
    FROM components c
";

/// Column list read by every component query, in `Component` field order.
pub const COMPONENT_COLUMNS: &str =
    "id, type, name, quantity, package, comment, manufacturer, store_links, location, tags, projects";

/// Tolerates NULLs left behind by databases written before the NOT NULL defaults.
pub const PROJECT_COLUMNS: &str =
    "id, name, COALESCE(description, ''), COALESCE(created_at, ''), status";

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "schema",
        "version": SCHEMA_VERSION.to_string(),
        "description": "SQLite layout for components, projects and their links",
        "tables": ["meta", "components", "projects", "project_components"],
        "views": ["components_with_projects"],
        "storage": [DEFAULT_DB_NAME]
    })
}
