//! Partbin: a local-first inventory of electronic components and the
//! projects that consume them.
//!
//! # Architecture
//!
//! ## The Thin Waist
//!
//! Every mutation runs through [`core::store::Store::write`], which hands the
//! work to `DbBroker`:
//! - one SQLite transaction per operation (commit or full rollback)
//! - one audit line per operation in `<db stem>.events.jsonl`
//!
//! ## Subsystems (Plugins)
//!
//! - `records`: component/project record types and typed field access
//! - `inventory`: components, projects and the links between them
//! - `assembly`: buildability checks and the atomic build-commit
//! - `reports`: low stock, project summaries, buildability explanations
//!
//! The front end (`cli`, `dispatch`, `shell`) turns commands into JSON
//! envelopes and renders them as text or JSON. The core never prints.
//!
//! # Examples
//!
//! ```bash
//! partbin add --type MCU --name STM32F401 --package LQFP-64 --quantity 10 --location "Bin A"
//! partbin new-project --name Blinker
//! partbin add-to --project 1 --component 1 --qty 12
//! partbin check --project 1
//! partbin build --project 1
//! partbin            # interactive shell
//! ```

pub mod cli;
pub mod core;
pub mod dispatch;
pub mod plugins;
pub mod shell;

use anyhow::Context;
use clap::Parser;
use crate::cli::{Cli, Command, OutputFormat};
use crate::core::config::{self, Config};
use crate::core::store::Store;
use crate::dispatch::StdinConfirm;
use std::io;
use std::process::ExitCode;

/// Install the stderr diagnostics subscriber. `RUST_LOG` wins over the
/// configured level; a second call is a no-op.
pub fn init_tracing(level: &str) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("partbin={}", level)));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}

fn run_command(
    store: &mut Store,
    config: &Config,
    command: &Command,
    format: OutputFormat,
) -> Result<ExitCode, crate::core::error::PartbinError> {
    let mut confirm = StdinConfirm;
    match dispatch::execute(store, config, command, &mut confirm) {
        Ok(out) => {
            dispatch::render(command, &out, format, &mut io::stdout())?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::debug!(cmd = command.envelope_name(), error = %e, "command failed");
            match format {
                OutputFormat::Json => {
                    dispatch::render_error(Some(command), &e, format, &mut io::stdout())?
                }
                OutputFormat::Text => {
                    dispatch::render_error(Some(command), &e, format, &mut io::stderr())?
                }
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Parse arguments, open the store, run one command or the shell, close.
///
/// Command failures are rendered here and reported through the exit code;
/// setup failures (config, opening the database) come back as errors.
pub fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("reading working directory")?;
    let mut config =
        config::load_config(cli.config.as_deref(), &cwd).context("loading configuration")?;
    if let Some(db) = &cli.db {
        config.database.path = db.clone();
    }
    init_tracing(&config.log.level);

    let mut store = Store::open_with_config(&config).with_context(|| {
        format!(
            "opening inventory database {}",
            config.database.path.display()
        )
    })?;

    let outcome = match &cli.command {
        None | Some(Command::Shell) => {
            shell::run_shell(&mut store, &config, cli.format).map(|()| ExitCode::SUCCESS)
        }
        Some(Command::Exit) => Ok(ExitCode::SUCCESS),
        Some(command) => run_command(&mut store, &config, command, cli.format),
    };
    let closed = store.close();

    let code = outcome?;
    closed.context("closing inventory database")?;
    Ok(code)
}
