//! CLI struct definitions for the Partbin command-line interface.
//!
//! All clap-derived types live here. Dispatch logic lives in `dispatch`.
//! The interactive shell parses each line with the same [`Command`] enum.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "partbin",
    version = env!("CARGO_PKG_VERSION"),
    about = "Partbin keeps a local inventory of electronic components and the projects that consume them. Run without a subcommand for the interactive shell."
)]
pub struct Cli {
    /// Inventory database file (overrides the config file and PARTBIN_DB).
    #[clap(long, global = true)]
    pub db: Option<PathBuf>,
    /// Config file to load instead of ./partbin.toml.
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,
    /// Output format: 'text' or 'json'.
    #[clap(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,
    #[clap(subcommand)]
    pub command: Option<Command>,
}

/// One line typed into the interactive shell.
#[derive(Parser, Debug)]
#[clap(
    name = "partbin",
    no_binary_name = true,
    disable_version_flag = true
)]
pub struct ShellLine {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(clap::Args, Debug, Clone, PartialEq, Eq)]
pub struct AddArgs {
    /// Component type, e.g. IC, Resistor, MCU
    #[clap(long = "type")]
    pub r#type: String,
    /// Part name, e.g. NE555
    #[clap(long)]
    pub name: String,
    /// Units to add; merged into an existing type/name/package
    #[clap(long, default_value_t = 0, allow_hyphen_values = true)]
    pub quantity: i64,
    /// Storage location, e.g. "Bin A3"
    #[clap(long)]
    pub location: String,
    #[clap(long, default_value = "")]
    pub package: String,
    #[clap(long, default_value = "")]
    pub comment: String,
    #[clap(long, default_value = "")]
    pub manufacturer: String,
    #[clap(long = "store-links", alias = "store_links", default_value = "")]
    pub store_links: String,
    #[clap(long, default_value = "")]
    pub tags: String,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List all components
    #[clap(name = "list", visible_alias = "l")]
    List,
    /// Add a component (merges stock into an existing type/name/package)
    #[clap(name = "add", visible_alias = "a")]
    Add(AddArgs),
    /// Search components; repeat --field/--value pairs to narrow
    #[clap(name = "search", visible_alias = "s")]
    Search {
        /// Field to match (defaults to name); see `fields`
        #[clap(long = "field")]
        fields: Vec<String>,
        /// Value to match; text fields match by substring
        #[clap(long = "value", required = true, allow_hyphen_values = true)]
        values: Vec<String>,
    },
    /// Set one field of a component
    #[clap(name = "update", visible_alias = "u")]
    Update {
        #[clap(long)]
        id: i64,
        #[clap(long)]
        field: String,
        #[clap(long, allow_hyphen_values = true)]
        value: String,
    },
    /// Delete a component; asks before unlinking it from projects
    #[clap(name = "delete", visible_alias = "d")]
    Delete {
        #[clap(long)]
        id: i64,
        /// Unlink from every project without asking
        #[clap(long)]
        force: bool,
    },
    /// Show name, manufacturer and store links of a component
    #[clap(name = "info")]
    Info {
        #[clap(long)]
        id: i64,
    },
    /// List the component fields usable with search and update
    #[clap(name = "fields", visible_alias = "f")]
    Fields,
    /// List projects
    #[clap(name = "projects", visible_alias = "pj")]
    Projects,
    /// Create a project (returns the existing id if the name is taken)
    #[clap(name = "new-project", visible_alias = "np")]
    NewProject {
        #[clap(long)]
        name: String,
        #[clap(long, default_value = "")]
        desc: String,
    },
    /// Delete a project and its component requirements
    #[clap(name = "del-project", visible_alias = "dp")]
    DelProject {
        #[clap(long)]
        id: i64,
        /// Skip the confirmation prompt
        #[clap(long)]
        yes: bool,
    },
    /// Mark a project archived
    #[clap(name = "archive-project")]
    ArchiveProject {
        #[clap(long)]
        id: i64,
    },
    /// Require a quantity of a component for a project
    #[clap(name = "add-to", visible_alias = "at")]
    AddTo {
        #[clap(long)]
        project: i64,
        #[clap(long)]
        component: i64,
        #[clap(long, allow_hyphen_values = true)]
        qty: i64,
    },
    /// Drop a component from a project
    #[clap(name = "remove-from", visible_alias = "rf")]
    RemoveFrom {
        #[clap(long)]
        project: i64,
        #[clap(long)]
        component: i64,
    },
    /// List a project's components with required and available quantities
    #[clap(name = "components", visible_alias = "pc")]
    Components {
        #[clap(long)]
        project: i64,
    },
    /// Check whether a project can be built from current stock
    #[clap(name = "check", visible_alias = "cb")]
    Check {
        #[clap(long)]
        project: i64,
    },
    /// Build a project: deduct its components and mark it completed
    #[clap(name = "build", visible_alias = "bp")]
    Build {
        #[clap(long)]
        project: i64,
    },
    /// List components below a stock threshold
    #[clap(name = "low", visible_alias = "lw")]
    Low {
        /// Defaults to reports.low_stock_threshold from the config
        #[clap(long)]
        threshold: Option<i64>,
    },
    /// Show a project with its components
    #[clap(name = "summary", visible_alias = "sm")]
    Summary {
        #[clap(long)]
        project: i64,
    },
    /// Print the machine-readable description of every subsystem
    #[clap(name = "schema")]
    Schema,
    /// Start the interactive shell
    #[clap(name = "shell")]
    Shell,
    /// Leave the interactive shell
    #[clap(name = "exit", visible_aliases = ["x", "quit"])]
    Exit,
}

impl Command {
    /// Envelope `cmd` value for this command.
    pub fn envelope_name(&self) -> &'static str {
        match self {
            Command::List => "inventory.list",
            Command::Add(_) => "inventory.add",
            Command::Search { .. } => "inventory.search",
            Command::Update { .. } => "inventory.update",
            Command::Delete { .. } => "inventory.delete",
            Command::Info { .. } => "reports.info",
            Command::Fields => "inventory.fields",
            Command::Projects => "project.list",
            Command::NewProject { .. } => "project.create",
            Command::DelProject { .. } => "project.delete",
            Command::ArchiveProject { .. } => "project.archive",
            Command::AddTo { .. } => "project.add_component",
            Command::RemoveFrom { .. } => "project.remove_component",
            Command::Components { .. } => "project.components",
            Command::Check { .. } => "assembly.check",
            Command::Build { .. } => "assembly.build",
            Command::Low { .. } => "reports.low",
            Command::Summary { .. } => "reports.summary",
            Command::Schema => "schema",
            Command::Shell => "shell",
            Command::Exit => "exit",
        }
    }
}
