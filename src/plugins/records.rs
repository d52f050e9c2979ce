//! Record types for components, projects and the links between them.
//!
//! Field access is closed over [`ComponentField`]; free-form "set field X to Y"
//! requests become a [`FieldUpdate`] or [`SearchFilter`] and are validated here
//! before any SQL runs.

use crate::core::error::PartbinError;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub id: i64,
    #[serde(rename = "type")]
    pub r#type: String,
    pub name: String,
    pub quantity: i64,
    pub package: String,
    pub comment: String,
    pub manufacturer: String,
    pub store_links: String,
    pub location: String,
    pub tags: String,
    /// Space-separated `proj_<id>` tokens, derived from the link table on read.
    pub projects: String,
}

impl Component {
    pub fn validate(&self) -> Result<(), PartbinError> {
        validate_required(&self.r#type, &self.name, &self.location)?;
        validate_stock(self.quantity)
    }
}

/// A component that has not been stored yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComponent {
    #[serde(rename = "type")]
    pub r#type: String,
    pub name: String,
    pub quantity: i64,
    pub package: String,
    pub comment: String,
    pub manufacturer: String,
    pub store_links: String,
    pub location: String,
    pub tags: String,
}

impl NewComponent {
    pub fn new(r#type: &str, name: &str, package: &str, quantity: i64, location: &str) -> Self {
        Self {
            r#type: r#type.to_string(),
            name: name.to_string(),
            package: package.to_string(),
            quantity,
            location: location.to_string(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), PartbinError> {
        validate_required(&self.r#type, &self.name, &self.location)?;
        validate_stock(self.quantity)
    }
}

fn validate_required(r#type: &str, name: &str, location: &str) -> Result<(), PartbinError> {
    for (field, value) in [("type", r#type), ("name", name), ("location", location)] {
        if value.trim().is_empty() {
            return Err(PartbinError::ValidationError(format!(
                "component field '{}' is required",
                field
            )));
        }
    }
    Ok(())
}

pub fn validate_stock(quantity: i64) -> Result<(), PartbinError> {
    if quantity < 0 {
        return Err(PartbinError::ValidationError(format!(
            "quantity must not be negative, got {}",
            quantity
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Completed,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = PartbinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ProjectStatus::Active),
            "completed" => Ok(ProjectStatus::Completed),
            "archived" => Ok(ProjectStatus::Archived),
            other => Err(PartbinError::ValidationError(format!(
                "unknown project status '{}'",
                other
            ))),
        }
    }
}

impl ToSql for ProjectStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ProjectStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: PartbinError| FromSqlError::Other(Box::new(e)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub status: ProjectStatus,
}

/// How many units of one component a project requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectComponent {
    pub project_id: i64,
    pub component_id: i64,
    pub quantity: i64,
}

impl ProjectComponent {
    pub fn new(project_id: i64, component_id: i64, quantity: i64) -> Result<Self, PartbinError> {
        if quantity <= 0 {
            return Err(PartbinError::InvalidQuantity(quantity));
        }
        Ok(Self {
            project_id,
            component_id,
            quantity,
        })
    }
}

/// One line of a project's bill of materials joined with current stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredComponent {
    #[serde(rename = "id")]
    pub component_id: i64,
    #[serde(rename = "type")]
    pub r#type: String,
    pub name: String,
    pub required: i64,
    pub available: i64,
    pub package: String,
    pub location: String,
}

impl RequiredComponent {
    pub fn is_satisfied(&self) -> bool {
        self.available >= self.required
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentField {
    Id,
    Type,
    Name,
    Quantity,
    Package,
    Comment,
    Manufacturer,
    StoreLinks,
    Location,
    Tags,
    Projects,
}

impl ComponentField {
    pub const ALL: [ComponentField; 11] = [
        ComponentField::Id,
        ComponentField::Type,
        ComponentField::Name,
        ComponentField::Quantity,
        ComponentField::Package,
        ComponentField::Comment,
        ComponentField::Manufacturer,
        ComponentField::StoreLinks,
        ComponentField::Location,
        ComponentField::Tags,
        ComponentField::Projects,
    ];

    /// Column name; also the field name accepted from users.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentField::Id => "id",
            ComponentField::Type => "type",
            ComponentField::Name => "name",
            ComponentField::Quantity => "quantity",
            ComponentField::Package => "package",
            ComponentField::Comment => "comment",
            ComponentField::Manufacturer => "manufacturer",
            ComponentField::StoreLinks => "store_links",
            ComponentField::Location => "location",
            ComponentField::Tags => "tags",
            ComponentField::Projects => "projects",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ComponentField::Id | ComponentField::Quantity)
    }

    pub fn is_writable(&self) -> bool {
        !matches!(self, ComponentField::Id | ComponentField::Projects)
    }
}

impl fmt::Display for ComponentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentField {
    type Err = PartbinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        ComponentField::ALL
            .into_iter()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| {
                PartbinError::ValidationError(format!(
                    "unknown component field '{}' (expected one of: {})",
                    s,
                    ComponentField::ALL.map(|f| f.as_str()).join(", ")
                ))
            })
    }
}

/// A single-field change to an existing component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    Type(String),
    Name(String),
    Quantity(i64),
    Package(String),
    Comment(String),
    Manufacturer(String),
    StoreLinks(String),
    Location(String),
    Tags(String),
}

impl FieldUpdate {
    /// Build an update from user text; `id` and `projects` are read-only.
    pub fn parse(field: ComponentField, value: &str) -> Result<Self, PartbinError> {
        let text = value.to_string();
        let update = match field {
            ComponentField::Type => FieldUpdate::Type(text),
            ComponentField::Name => FieldUpdate::Name(text),
            ComponentField::Quantity => FieldUpdate::Quantity(parse_integer(field, value)?),
            ComponentField::Package => FieldUpdate::Package(text),
            ComponentField::Comment => FieldUpdate::Comment(text),
            ComponentField::Manufacturer => FieldUpdate::Manufacturer(text),
            ComponentField::StoreLinks => FieldUpdate::StoreLinks(text),
            ComponentField::Location => FieldUpdate::Location(text),
            ComponentField::Tags => FieldUpdate::Tags(text),
            ComponentField::Id | ComponentField::Projects => {
                return Err(PartbinError::ValidationError(format!(
                    "component field '{}' is read-only",
                    field
                )));
            }
        };
        Ok(update)
    }

    pub fn field(&self) -> ComponentField {
        match self {
            FieldUpdate::Type(_) => ComponentField::Type,
            FieldUpdate::Name(_) => ComponentField::Name,
            FieldUpdate::Quantity(_) => ComponentField::Quantity,
            FieldUpdate::Package(_) => ComponentField::Package,
            FieldUpdate::Comment(_) => ComponentField::Comment,
            FieldUpdate::Manufacturer(_) => ComponentField::Manufacturer,
            FieldUpdate::StoreLinks(_) => ComponentField::StoreLinks,
            FieldUpdate::Location(_) => ComponentField::Location,
            FieldUpdate::Tags(_) => ComponentField::Tags,
        }
    }

    pub fn apply(&self, component: &mut Component) {
        match self.clone() {
            FieldUpdate::Type(v) => component.r#type = v,
            FieldUpdate::Name(v) => component.name = v,
            FieldUpdate::Quantity(v) => component.quantity = v,
            FieldUpdate::Package(v) => component.package = v,
            FieldUpdate::Comment(v) => component.comment = v,
            FieldUpdate::Manufacturer(v) => component.manufacturer = v,
            FieldUpdate::StoreLinks(v) => component.store_links = v,
            FieldUpdate::Location(v) => component.location = v,
            FieldUpdate::Tags(v) => component.tags = v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Text(String),
    Integer(i64),
}

/// One search criterion. Text fields match by substring, numeric fields exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchFilter {
    pub field: ComponentField,
    pub value: FilterValue,
}

impl SearchFilter {
    pub fn parse(field: &str, value: &str) -> Result<Self, PartbinError> {
        let field: ComponentField = field.parse()?;
        let value = if field.is_numeric() {
            FilterValue::Integer(parse_integer(field, value)?)
        } else {
            FilterValue::Text(value.to_string())
        };
        Ok(Self { field, value })
    }

    pub fn text(field: ComponentField, value: &str) -> Self {
        Self {
            field,
            value: FilterValue::Text(value.to_string()),
        }
    }

    pub fn integer(field: ComponentField, value: i64) -> Self {
        Self {
            field,
            value: FilterValue::Integer(value),
        }
    }
}

fn parse_integer(field: ComponentField, value: &str) -> Result<i64, PartbinError> {
    value.trim().parse::<i64>().map_err(|_| {
        PartbinError::ValidationError(format!(
            "component field '{}' expects an integer, got '{}'",
            field, value
        ))
    })
}
