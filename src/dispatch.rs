//! Command dispatch shared by one-shot invocations and the interactive shell.
//!
//! Every command first produces a JSON envelope; `--format json` prints it
//! as-is and text mode renders it for people.

use crate::cli::{AddArgs, Command, OutputFormat};
use crate::core::broker;
use crate::core::config::Config;
use crate::core::error::PartbinError;
use crate::core::output::render_table;
use crate::core::schemas;
use crate::core::store::Store;
use crate::core::time::command_envelope;
use crate::plugins::records::{ComponentField, FieldUpdate, NewComponent, SearchFilter};
use crate::plugins::{assembly, inventory, reports};
use colored::Colorize;
use serde_json::{Value as JsonValue, json};
use std::io::{self, BufRead, Write};

/// Yes/no questions asked before destructive operations.
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> Result<bool, PartbinError>;
}

/// Asks on stdout and reads the answer from stdin. Anything but y/yes is a no.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, question: &str) -> Result<bool, PartbinError> {
        let mut stdout = io::stdout();
        write!(stdout, "{} [y/N]: ", question)?;
        stdout.flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(matches!(
            answer.trim().to_ascii_lowercase().as_str(),
            "y" | "yes"
        ))
    }
}

/// Fixed answer, for scripted sessions.
pub struct Answer(pub bool);

impl Confirm for Answer {
    fn confirm(&mut self, _question: &str) -> Result<bool, PartbinError> {
        Ok(self.0)
    }
}

fn search_filters(fields: &[String], values: &[String]) -> Result<Vec<SearchFilter>, PartbinError> {
    if fields.len() > values.len() {
        return Err(PartbinError::ValidationError(format!(
            "{} --field given but only {} --value",
            fields.len(),
            values.len()
        )));
    }
    values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let field = fields.get(i).map(String::as_str).unwrap_or("name");
            SearchFilter::parse(field, value)
        })
        .collect()
}

fn new_component(args: &AddArgs) -> NewComponent {
    NewComponent {
        r#type: args.r#type.clone(),
        name: args.name.clone(),
        quantity: args.quantity,
        package: args.package.clone(),
        comment: args.comment.clone(),
        manufacturer: args.manufacturer.clone(),
        store_links: args.store_links.clone(),
        location: args.location.clone(),
        tags: args.tags.clone(),
    }
}

fn delete_with_confirmation(
    store: &mut Store,
    id: i64,
    force: bool,
    confirm: &mut dyn Confirm,
) -> Result<JsonValue, PartbinError> {
    let cmd = "inventory.delete";
    let unlinked = match inventory::delete_component(store, id, force) {
        Ok(unlinked) => unlinked,
        Err(PartbinError::InUse {
            component_id,
            projects,
        }) => {
            let listed = projects
                .iter()
                .map(|p| format!("  - [{}] {}", p.id, p.name))
                .collect::<Vec<_>>()
                .join("\n");
            let question = format!(
                "Component {} is used in the following projects:\n{}\nRemove it from all projects and delete it?",
                component_id, listed
            );
            if !confirm.confirm(&question)? {
                return Ok(command_envelope(
                    cmd,
                    "cancelled",
                    json!({ "id": component_id, "projects": projects }),
                ));
            }
            inventory::delete_component(store, component_id, true)?
        }
        Err(e) => return Err(e),
    };
    Ok(command_envelope(
        cmd,
        "ok",
        json!({ "id": id, "unlinked_projects": unlinked }),
    ))
}

/// Aggregated description of every subsystem.
pub fn schema_document() -> JsonValue {
    json!({
        "name": "partbin",
        "version": env!("CARGO_PKG_VERSION"),
        "subsystems": [
            schemas::schema(),
            broker::schema(),
            inventory::schema(),
            assembly::schema(),
            reports::schema(),
        ]
    })
}

/// Run one command against the store and describe the outcome.
///
/// Core errors propagate unchanged; "nothing there" outcomes come back as
/// envelopes with a `not_found`, `rejected` or `cancelled` status.
pub fn execute(
    store: &mut Store,
    config: &Config,
    command: &Command,
    confirm: &mut dyn Confirm,
) -> Result<JsonValue, PartbinError> {
    let cmd = command.envelope_name();
    let out = match command {
        Command::List => {
            let items = inventory::list_components(store)?;
            command_envelope(cmd, "ok", json!({ "items": items }))
        }
        Command::Add(args) => {
            let id = inventory::add_component(store, &new_component(args))?;
            let item = inventory::get_component(store, id)?;
            command_envelope(cmd, "ok", json!({ "id": id, "item": item }))
        }
        Command::Search { fields, values } => {
            let filters = search_filters(fields, values)?;
            let items = inventory::search_components(store, &filters)?;
            command_envelope(cmd, "ok", json!({ "filters": filters, "items": items }))
        }
        Command::Update { id, field, value } => {
            let update = FieldUpdate::parse(field.parse()?, value)?;
            let item = inventory::update_component_field(store, *id, &update)?;
            command_envelope(cmd, "ok", json!({ "id": id, "field": update.field(), "item": item }))
        }
        Command::Delete { id, force } => delete_with_confirmation(store, *id, *force, confirm)?,
        Command::Info { id } => {
            let item = reports::component_info(store, *id)?;
            let status = if item.is_some() { "ok" } else { "not_found" };
            command_envelope(cmd, status, json!({ "id": id, "item": item }))
        }
        Command::Fields => {
            let fields: Vec<JsonValue> = ComponentField::ALL
                .iter()
                .map(|f| {
                    json!({
                        "name": f.as_str(),
                        "numeric": f.is_numeric(),
                        "writable": f.is_writable(),
                    })
                })
                .collect();
            command_envelope(cmd, "ok", json!({ "fields": fields }))
        }
        Command::Projects => {
            let items = inventory::list_projects(store)?;
            command_envelope(cmd, "ok", json!({ "items": items }))
        }
        Command::NewProject { name, desc } => {
            let id = inventory::create_project(store, name, desc)?;
            command_envelope(cmd, "ok", json!({ "id": id, "name": name }))
        }
        Command::DelProject { id, yes } => {
            let Some(project) = inventory::get_project(store, *id)? else {
                return Err(PartbinError::NotFound(format!("project {}", id)));
            };
            let question = format!(
                "Delete project [{}] {} and its component requirements?",
                project.id, project.name
            );
            if !*yes && !confirm.confirm(&question)? {
                command_envelope(cmd, "cancelled", json!({ "id": id }))
            } else {
                inventory::delete_project(store, *id)?;
                command_envelope(cmd, "ok", json!({ "id": id, "name": project.name }))
            }
        }
        Command::ArchiveProject { id } => {
            inventory::archive_project(store, *id)?;
            command_envelope(cmd, "ok", json!({ "id": id }))
        }
        Command::AddTo {
            project,
            component,
            qty,
        } => {
            let linked = inventory::add_component_to_project(store, *project, *component, *qty)?;
            let status = if linked { "ok" } else { "rejected" };
            command_envelope(
                cmd,
                status,
                json!({ "project_id": project, "component_id": component, "quantity": qty }),
            )
        }
        Command::RemoveFrom { project, component } => {
            let removed = inventory::remove_component_from_project(store, *project, *component)?;
            let status = if removed { "ok" } else { "not_found" };
            command_envelope(
                cmd,
                status,
                json!({ "project_id": project, "component_id": component }),
            )
        }
        Command::Components { project } => {
            let items = inventory::get_project_components(store, *project)?;
            command_envelope(cmd, "ok", json!({ "project_id": project, "items": items }))
        }
        Command::Check { project } => {
            let check = assembly::can_build(store, *project)?;
            let lines = reports::explain(&check);
            command_envelope(
                cmd,
                "ok",
                json!({
                    "project_id": project,
                    "satisfied": check.satisfied,
                    "shortfalls": check.shortfalls,
                    "lines": lines,
                }),
            )
        }
        Command::Build { project } => {
            let built = assembly::build_project(store, *project)?;
            let status = if built { "ok" } else { "not_found" };
            command_envelope(cmd, status, json!({ "project_id": project }))
        }
        Command::Low { threshold } => {
            let threshold = threshold.unwrap_or(config.reports.low_stock_threshold);
            let items = reports::low_stock(store, Some(threshold))?;
            command_envelope(cmd, "ok", json!({ "threshold": threshold, "items": items }))
        }
        Command::Summary { project } => {
            let summary = reports::project_summary(store, *project)?;
            let status = if summary.is_some() { "ok" } else { "not_found" };
            command_envelope(cmd, status, json!({ "project_id": project, "summary": summary }))
        }
        Command::Schema => command_envelope(cmd, "ok", json!({ "schema": schema_document() })),
        Command::Shell | Command::Exit => command_envelope(cmd, "ok", json!({})),
    };
    Ok(out)
}

/// JSON envelope describing a failed command.
pub fn error_envelope(command: &Command, err: &PartbinError) -> JsonValue {
    let mut extra = json!({ "error": { "code": err.code(), "message": err.to_string() } });
    match err {
        PartbinError::InUse { projects, .. } => extra["error"]["projects"] = json!(projects),
        PartbinError::InsufficientStock { shortfalls, .. } => {
            extra["error"]["shortfalls"] = json!(shortfalls)
        }
        _ => {}
    }
    command_envelope(command.envelope_name(), "error", extra)
}

fn text<'a>(v: &'a JsonValue, key: &str) -> &'a str {
    v.get(key).and_then(|x| x.as_str()).unwrap_or("")
}

fn number(v: &JsonValue, key: &str) -> String {
    v.get(key)
        .and_then(|x| x.as_i64())
        .map(|n| n.to_string())
        .unwrap_or_else(|| "?".to_string())
}

fn items(out: &JsonValue) -> &[JsonValue] {
    out.get("items")
        .and_then(|x| x.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn component_table(rows: &[JsonValue]) -> String {
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|c| {
            vec![
                number(c, "id"),
                text(c, "type").to_string(),
                text(c, "name").to_string(),
                text(c, "package").to_string(),
                number(c, "quantity"),
                text(c, "location").to_string(),
                text(c, "projects").to_string(),
            ]
        })
        .collect();
    render_table(
        &["ID", "Type", "Name", "Package", "Qty", "Location", "Projects"],
        &rows,
    )
}

fn status_of(out: &JsonValue) -> &str {
    text(out, "status")
}

/// Print a successful outcome in the requested format.
pub fn render(
    command: &Command,
    out: &JsonValue,
    format: OutputFormat,
    w: &mut dyn Write,
) -> Result<(), PartbinError> {
    if format == OutputFormat::Json {
        writeln!(w, "{}", serde_json::to_string_pretty(out)?)?;
        return Ok(());
    }

    let status = status_of(out);
    match command {
        Command::List | Command::Search { .. } => {
            let rows = items(out);
            if rows.is_empty() {
                writeln!(w, "No components found.")?;
            } else {
                writeln!(w, "{}", component_table(rows))?;
            }
        }
        Command::Low { .. } => {
            let rows = items(out);
            if rows.is_empty() {
                writeln!(w, "No components below {}.", number(out, "threshold"))?;
            } else {
                writeln!(w, "Low stock (below {}):", number(out, "threshold"))?;
                writeln!(w, "{}", component_table(rows))?;
            }
        }
        Command::Add(_) => {
            let item = out.get("item").cloned().unwrap_or(JsonValue::Null);
            writeln!(
                w,
                "{} {} (id {}, quantity {})",
                "Stored".green(),
                text(&item, "name"),
                number(out, "id"),
                number(&item, "quantity")
            )?;
        }
        Command::Update { .. } => {
            let field = text(out, "field");
            writeln!(
                w,
                "{} field '{}' of component {}.",
                "Updated".green(),
                field,
                number(out, "id")
            )?;
        }
        Command::Delete { .. } => {
            if status == "cancelled" {
                writeln!(w, "Deletion cancelled.")?;
            } else {
                let unlinked = out
                    .get("unlinked_projects")
                    .and_then(|x| x.as_array())
                    .map(|a| a.len())
                    .unwrap_or(0);
                write!(w, "{} component {}", "Deleted".green(), number(out, "id"))?;
                if unlinked > 0 {
                    write!(w, " (removed from {} project(s))", unlinked)?;
                }
                writeln!(w, ".")?;
            }
        }
        Command::Info { .. } => match out.get("item").filter(|v| !v.is_null()) {
            Some(item) => {
                writeln!(w, "{}", render_table(
                    &["Name", "Manufacturer", "Store links"],
                    &[vec![
                        text(item, "name").to_string(),
                        text(item, "manufacturer").to_string(),
                        text(item, "store_links").to_string(),
                    ]],
                ))?;
            }
            None => writeln!(w, "Component {} not found.", number(out, "id"))?,
        },
        Command::Fields => {
            if let Some(fields) = out.get("fields").and_then(|x| x.as_array()) {
                for f in fields {
                    let writable = f.get("writable").and_then(|x| x.as_bool()).unwrap_or(false);
                    let numeric = f.get("numeric").and_then(|x| x.as_bool()).unwrap_or(false);
                    let mut notes = Vec::new();
                    if numeric {
                        notes.push("integer");
                    }
                    if !writable {
                        notes.push("read-only");
                    }
                    if notes.is_empty() {
                        writeln!(w, "- {}", text(f, "name"))?;
                    } else {
                        writeln!(w, "- {} ({})", text(f, "name"), notes.join(", "))?;
                    }
                }
            }
        }
        Command::Projects => {
            let rows: Vec<Vec<String>> = items(out)
                .iter()
                .map(|p| {
                    vec![
                        number(p, "id"),
                        text(p, "name").to_string(),
                        text(p, "status").to_string(),
                        text(p, "created_at").to_string(),
                        text(p, "description").to_string(),
                    ]
                })
                .collect();
            if rows.is_empty() {
                writeln!(w, "No projects found.")?;
            } else {
                writeln!(
                    w,
                    "{}",
                    render_table(&["ID", "Name", "Status", "Created", "Description"], &rows)
                )?;
            }
        }
        Command::NewProject { .. } => {
            writeln!(
                w,
                "Project '{}' has id {}.",
                text(out, "name"),
                number(out, "id")
            )?;
        }
        Command::DelProject { .. } => {
            if status == "cancelled" {
                writeln!(w, "Deletion cancelled.")?;
            } else {
                writeln!(w, "{} project '{}'.", "Deleted".green(), text(out, "name"))?;
            }
        }
        Command::ArchiveProject { .. } => {
            writeln!(w, "Project {} archived.", number(out, "id"))?;
        }
        Command::AddTo { .. } => {
            if status == "ok" {
                writeln!(
                    w,
                    "Project {} now requires {} of component {}.",
                    number(out, "project_id"),
                    number(out, "quantity"),
                    number(out, "component_id")
                )?;
            } else {
                writeln!(
                    w,
                    "{} could not link component {} to project {}.",
                    "Failed:".red(),
                    number(out, "component_id"),
                    number(out, "project_id")
                )?;
            }
        }
        Command::RemoveFrom { .. } => {
            if status == "ok" {
                writeln!(
                    w,
                    "Removed component {} from project {}.",
                    number(out, "component_id"),
                    number(out, "project_id")
                )?;
            } else {
                writeln!(
                    w,
                    "Component {} is not part of project {}.",
                    number(out, "component_id"),
                    number(out, "project_id")
                )?;
            }
        }
        Command::Components { .. } => {
            let rows = items(out);
            if rows.is_empty() {
                writeln!(w, "No components in project {}.", number(out, "project_id"))?;
            } else {
                writeln!(w, "{}", requirement_table(rows))?;
            }
        }
        Command::Check { .. } => {
            let satisfied = out
                .get("satisfied")
                .and_then(|x| x.as_bool())
                .unwrap_or(false);
            let lines = out
                .get("lines")
                .and_then(|x| x.as_array())
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            if satisfied {
                for line in lines {
                    writeln!(w, "{}", line.as_str().unwrap_or("").green())?;
                }
            } else {
                writeln!(w, "{}", "Missing components:".yellow())?;
                for line in lines {
                    writeln!(w, "  {}", line.as_str().unwrap_or(""))?;
                }
            }
        }
        Command::Build { .. } => {
            if status == "ok" {
                writeln!(
                    w,
                    "{} project {} built; stock deducted.",
                    "Done:".green(),
                    number(out, "project_id")
                )?;
            } else {
                writeln!(w, "Project {} not found.", number(out, "project_id"))?;
            }
        }
        Command::Summary { .. } => match out.get("summary").filter(|v| !v.is_null()) {
            Some(summary) => {
                writeln!(
                    w,
                    "{} [{}] ({})",
                    text(summary, "name").bold(),
                    number(summary, "id"),
                    text(summary, "status")
                )?;
                let rows = summary
                    .get("components")
                    .and_then(|x| x.as_array())
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                if rows.is_empty() {
                    writeln!(w, "No components.")?;
                } else {
                    writeln!(w, "{}", requirement_table(rows))?;
                }
            }
            None => writeln!(w, "Project {} not found.", number(out, "project_id"))?,
        },
        Command::Schema => {
            let schema = out.get("schema").cloned().unwrap_or(JsonValue::Null);
            writeln!(w, "{}", serde_json::to_string_pretty(&schema)?)?;
        }
        Command::Shell | Command::Exit => {}
    }
    Ok(())
}

fn requirement_table(rows: &[JsonValue]) -> String {
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|c| {
            let required = c.get("required").and_then(|x| x.as_i64()).unwrap_or(0);
            let available = c.get("available").and_then(|x| x.as_i64()).unwrap_or(0);
            let mark = if available >= required { "ok" } else { "short" };
            vec![
                number(c, "id"),
                text(c, "name").to_string(),
                required.to_string(),
                available.to_string(),
                mark.to_string(),
            ]
        })
        .collect();
    render_table(&["ID", "Name", "Required", "Available", ""], &rows)
}

/// Print a failed command in the requested format.
pub fn render_error(
    command: Option<&Command>,
    err: &PartbinError,
    format: OutputFormat,
    w: &mut dyn Write,
) -> Result<(), PartbinError> {
    if let (OutputFormat::Json, Some(command)) = (format, command) {
        writeln!(w, "{}", serde_json::to_string_pretty(&error_envelope(command, err))?)?;
        return Ok(());
    }
    match err {
        PartbinError::InsufficientStock {
            project_id,
            shortfalls,
        } => {
            writeln!(
                w,
                "{} cannot build project {}. Missing components:",
                "Error:".red(),
                project_id
            )?;
            for s in shortfalls {
                writeln!(w, "  {}, short by {}", s, s.missing())?;
            }
        }
        _ => writeln!(w, "{} {}", "Error:".red(), err)?,
    }
    Ok(())
}
