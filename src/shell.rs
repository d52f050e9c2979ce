//! Interactive line shell over the same command set as the CLI.

use crate::cli::{Command, OutputFormat, ShellLine};
use crate::core::config::Config;
use crate::core::error::PartbinError;
use crate::core::store::Store;
use crate::dispatch::{self, Confirm, StdinConfirm};
use clap::Parser;
use std::io::{self, BufRead, Write};

pub const BANNER: &str = "Partbin component inventory shell. Type 'help' to list commands, 'exit' to leave.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellAction {
    Continue,
    Exit,
}

/// Split a line into words. Single quotes keep everything literal; double
/// quotes and bare words honor backslash escapes.
pub fn tokenize(line: &str) -> Result<Vec<String>, PartbinError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(ch) = chars.next() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (None, '\\') | (Some('"'), '\\') => {
                let Some(escaped) = chars.next() else {
                    return Err(PartbinError::ValidationError(
                        "line ends with a dangling backslash".to_string(),
                    ));
                };
                current.push(escaped);
                in_token = true;
            }
            (Some(_), c) => current.push(c),
            (None, '"') | (None, '\'') => {
                quote = Some(ch);
                in_token = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if let Some(q) = quote {
        return Err(PartbinError::ValidationError(format!(
            "unterminated {} quote",
            if q == '"' { "double" } else { "single" }
        )));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Handle one input line. Command failures are printed and the session goes
/// on; only a failure to write output is returned.
pub fn handle_line(
    store: &mut Store,
    config: &Config,
    format: OutputFormat,
    line: &str,
    confirm: &mut dyn Confirm,
    w: &mut dyn Write,
) -> Result<ShellAction, PartbinError> {
    let mut tokens = match tokenize(line) {
        Ok(tokens) => tokens,
        Err(e) => {
            dispatch::render_error(None, &e, format, w)?;
            return Ok(ShellAction::Continue);
        }
    };
    let Some(first) = tokens.first_mut() else {
        return Ok(ShellAction::Continue);
    };
    if matches!(first.as_str(), "?" | "h") {
        *first = "help".to_string();
    }

    let parsed = match ShellLine::try_parse_from(&tokens) {
        Ok(parsed) => parsed,
        Err(e) => {
            write!(w, "{}", e.render())?;
            return Ok(ShellAction::Continue);
        }
    };

    match &parsed.command {
        Command::Exit => {
            writeln!(w, "Bye.")?;
            return Ok(ShellAction::Exit);
        }
        Command::Shell => {
            writeln!(w, "Already in the shell.")?;
            return Ok(ShellAction::Continue);
        }
        _ => {}
    }

    match dispatch::execute(store, config, &parsed.command, confirm) {
        Ok(out) => dispatch::render(&parsed.command, &out, format, w)?,
        Err(e) => {
            tracing::debug!(cmd = parsed.command.envelope_name(), error = %e, "shell command failed");
            dispatch::render_error(Some(&parsed.command), &e, format, w)?;
        }
    }
    Ok(ShellAction::Continue)
}

/// Read-eval-print loop on stdin until `exit` or end of input.
pub fn run_shell(
    store: &mut Store,
    config: &Config,
    format: OutputFormat,
) -> Result<(), PartbinError> {
    let mut stdout = io::stdout();
    let mut confirm = StdinConfirm;
    writeln!(stdout, "{}", BANNER)?;

    loop {
        write!(stdout, "{}", config.shell.prompt)?;
        stdout.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            writeln!(stdout)?;
            break;
        }
        if handle_line(store, config, format, &line, &mut confirm, &mut stdout)? == ShellAction::Exit {
            break;
        }
    }
    tracing::debug!("shell session ended");
    Ok(())
}
