//! Command set for the r2do shell.
//!
//! # Responsibility
//! - Parse the command line into one typed `CommandKind`.
//! - Map each command to exactly one `State` operation.
//! - Render operation results as output lines; never touch stdout directly.
//!
//! # Invariants
//! - The set of commands is closed (`CommandKind`); each verb is reachable by
//!   its short name or its `--long` flag form.
//! - Extra, missing, or misplaced arguments are parse errors, never ignored.

use crate::config::StoreBackend;
use crate::CliError;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{CommandFactory, Parser, Subcommand};
use r2do_core::{State, StateStore};
use std::ffi::OsString;

const NO_CURRENT_CATEGORY: &str = "No category is currently selected.";

#[derive(Debug, Parser)]
#[command(
    name = "r2do",
    about = "A tiny task tracker with categories",
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Storage backend for this invocation [default: sqlite]
    #[arg(long, value_enum, global = true)]
    pub store: Option<StoreBackend>,

    #[command(subcommand)]
    pub command: Option<CommandKind>,
}

/// Every verb the shell understands.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum CommandKind {
    /// Switches to the category NAME, creating it if needed.
    #[command(name = "cat", long_flag = "category")]
    Category { name: String },
    /// Lists all categories, marking the current one.
    #[command(name = "show", long_flag = "categories")]
    ShowCategories,
    /// Prints the current category.
    #[command(name = "now", long_flag = "current")]
    Current,
    /// Adds a new task to the current category.
    #[command(name = "task", long_flag = "task")]
    Task {
        #[arg(required = true, num_args = 1..)]
        description: Vec<String>,
    },
    /// Lists the tasks of the current category.
    #[command(name = "list", long_flag = "list")]
    List,
    /// Marks the task DESCRIPTION as completed.
    #[command(name = "done", long_flag = "done")]
    Done {
        #[arg(required = true, num_args = 1..)]
        description: Vec<String>,
    },
    /// Renames the category OLD to NEW.
    #[command(name = "rename", long_flag = "rename")]
    Rename { old: String, new: String },
    /// Deletes the category NAME and its tasks.
    #[command(name = "rm", long_flag = "remove")]
    Remove { name: String },
    /// Prints the application version.
    #[command(name = "version", short_flag = 'v', long_flag = "version")]
    Version,
}

/// Parses a full argument list, program name first.
///
/// Unknown verbs become `CliError::UnknownCommand`; every other clap outcome,
/// including `-h`, is carried as `CliError::Arguments`.
pub fn parse_args<I, T>(args: I) -> Result<Cli, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(args).map_err(|err| {
        if err.kind() == ErrorKind::InvalidSubcommand {
            if let Some(ContextValue::String(verb)) = err.get(ContextKind::InvalidSubcommand) {
                return CliError::UnknownCommand(verb.clone());
            }
        }
        CliError::Arguments(err)
    })
}

/// Help text, one entry per line; shown when no command is given.
pub fn help_lines() -> Vec<String> {
    Cli::command()
        .render_help()
        .to_string()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Runs one parsed command against `state`.
pub fn dispatch<S: StateStore>(
    state: &mut State<S>,
    command: &CommandKind,
) -> Result<Vec<String>, CliError> {
    log::debug!("event=command_dispatch module=cli kind={}", command.code());
    match command {
        CommandKind::Category { name } => handle_category(state, name),
        CommandKind::ShowCategories => Ok(show_categories(state)),
        CommandKind::Current => Ok(show_current(state)),
        CommandKind::Task { description } => handle_task(state, &description.join(" ")),
        CommandKind::List => Ok(list_tasks(state)),
        CommandKind::Done { description } => complete_task(state, &description.join(" ")),
        CommandKind::Rename { old, new } => rename_category(state, old, new),
        CommandKind::Remove { name } => remove_category(state, name),
        CommandKind::Version => Ok(vec![env!("CARGO_PKG_VERSION").to_string()]),
    }
}

impl CommandKind {
    /// Stable name for log lines; carries no user text.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Category { .. } => "category",
            Self::ShowCategories => "show_categories",
            Self::Current => "current",
            Self::Task { .. } => "task",
            Self::List => "list",
            Self::Done { .. } => "done",
            Self::Rename { .. } => "rename",
            Self::Remove { .. } => "remove",
            Self::Version => "version",
        }
    }
}

fn handle_category<S: StateStore>(
    state: &mut State<S>,
    name: &str,
) -> Result<Vec<String>, CliError> {
    let created = state.select_or_create(name)?;
    let extra = if created { "new " } else { "" };
    Ok(vec![format!("Switched to {extra}category '{name}'")])
}

fn show_categories<S: StateStore>(state: &State<S>) -> Vec<String> {
    state
        .categories()
        .iter()
        .map(|category| {
            let marker = if state.is_current(category) { '*' } else { ' ' };
            format!("{marker} {}", category.name)
        })
        .collect()
}

fn show_current<S: StateStore>(state: &State<S>) -> Vec<String> {
    let line = match state.current_category() {
        Some(category) => category.name.clone(),
        None => NO_CURRENT_CATEGORY.to_string(),
    };
    vec![line]
}

fn handle_task<S: StateStore>(
    state: &mut State<S>,
    description: &str,
) -> Result<Vec<String>, CliError> {
    let Some(category) = state.current_category().map(|category| category.name.clone()) else {
        return Ok(vec![NO_CURRENT_CATEGORY.to_string()]);
    };
    state.add_task(&category, description)?;
    Ok(vec!["Created new task".to_string()])
}

fn list_tasks<S: StateStore>(state: &State<S>) -> Vec<String> {
    let Some(category) = state.current_category() else {
        return vec![NO_CURRENT_CATEGORY.to_string()];
    };
    let mut lines: Vec<String> = category.render().lines().map(str::to_string).collect();
    if let Some(task) = state.current_task() {
        lines.push(String::new());
        lines.extend(task.details().lines().map(str::to_string));
    }
    lines
}

fn complete_task<S: StateStore>(
    state: &mut State<S>,
    description: &str,
) -> Result<Vec<String>, CliError> {
    state.complete_task(description)?;
    Ok(vec![format!("Completed task '{description}'")])
}

fn rename_category<S: StateStore>(
    state: &mut State<S>,
    original: &str,
    renamed: &str,
) -> Result<Vec<String>, CliError> {
    state.rename(original, renamed)?;
    Ok(vec![format!("Renamed category '{original}' to '{renamed}'")])
}

fn remove_category<S: StateStore>(
    state: &mut State<S>,
    name: &str,
) -> Result<Vec<String>, CliError> {
    state.remove(name)?;
    Ok(vec![format!("Removed category '{name}'")])
}
