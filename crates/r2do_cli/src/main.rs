//! r2do command-line entry point.
//!
//! # Responsibility
//! - Resolve configuration, start logging, and pick the storage backend.
//! - Run exactly one command per invocation and persist before exiting.
//!
//! # Invariants
//! - Store cleanup (`State::close`, `close_db`) runs even when the command fails.
//! - Errors go to stderr prefixed with `r2do:` (clap renders its own usage
//!   errors); the exit code is non-zero.

mod commands;
mod config;

use commands::CommandKind;
use config::{AppConfig, ConfigError, StoreBackend};
use r2do_core::db::{close_db, open_db, DbError};
use r2do_core::{
    init_logging, RelationalStore, SnapshotStore, State, StateError, StateStore, StoreError,
};
use std::error::Error;
use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::process::ExitCode;

/// Errors surfaced to the terminal.
#[derive(Debug)]
pub enum CliError {
    /// Command-line parse outcome, including `-h`; clap renders it.
    Arguments(clap::Error),
    Config(ConfigError),
    State(StateError),
    Db(DbError),
    Store(StoreError),
    UnknownCommand(String),
}

impl CliError {
    /// Stable error code for log lines; never carries names or descriptions.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Arguments(_) => "arguments",
            Self::Config(_) => "config",
            Self::State(err) => match err {
                StateError::Validation(_) => "validation",
                StateError::CategoryNotFound(_) => "category_not_found",
                StateError::TaskNotFound(_) => "task_not_found",
                StateError::CategoryAlreadyExists(_) => "category_already_exists",
                StateError::InvalidArgument(_) => "invalid_argument",
                StateError::Store(_) => "store",
            },
            Self::Db(_) => "db",
            Self::Store(_) => "store",
            Self::UnknownCommand(_) => "unknown_command",
        }
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Arguments(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::State(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::UnknownCommand(verb) => {
                write!(f, "'{verb}' is not an r2do command. See 'r2do -h'.")
            }
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Arguments(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::State(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::UnknownCommand(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<StateError> for CliError {
    fn from(value: StateError) -> Self {
        Self::State(value)
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<StoreError> for CliError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

fn main() -> ExitCode {
    match run(std::env::args_os()) {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
            ExitCode::SUCCESS
        }
        Err(CliError::Arguments(err)) => {
            let _ = err.print();
            if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            eprintln!("r2do: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: impl IntoIterator<Item = OsString>) -> Result<Vec<String>, CliError> {
    let cli = commands::parse_args(args)?;
    let Some(command) = cli.command else {
        return Ok(commands::help_lines());
    };

    let config = AppConfig::resolve(cli.store.unwrap_or_default())?;
    if let Err(err) = init_logging(config.log_level, &config.log_dir()) {
        eprintln!("r2do: logging disabled: {err}");
    }
    log::info!(
        "event=cli_start module=cli status=ok backend={:?} command={}",
        config.backend,
        command.code()
    );

    match config.backend {
        StoreBackend::Sqlite => {
            let conn = open_db(config.data_path())?;
            let outcome = RelationalStore::try_new(&conn)
                .map_err(CliError::from)
                .and_then(|store| run_with(store, &command));
            let closed = close_db(conn);
            let lines = outcome?;
            closed?;
            Ok(lines)
        }
        StoreBackend::Snapshot => run_with(SnapshotStore::new(config.data_path()), &command),
    }
}

fn run_with<S: StateStore>(store: S, command: &CommandKind) -> Result<Vec<String>, CliError> {
    let mut state = State::open(store)?;
    let outcome = commands::dispatch(&mut state, command);
    let closed = state.close();
    if let Err(err) = &outcome {
        log::warn!(
            "event=command_failed module=cli status=error command={} error_kind={}",
            command.code(),
            err.kind()
        );
    }
    let lines = outcome?;
    closed?;
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::{commands, run_with, CliError, CommandKind};
    use r2do_core::db::open_db;
    use r2do_core::{RelationalStore, SnapshotStore, StateError, ValidationError};

    fn command(values: &[&str]) -> CommandKind {
        let cli = commands::parse_args(std::iter::once("r2do").chain(values.iter().copied()))
            .unwrap();
        cli.command.unwrap()
    }

    #[test]
    fn snapshot_backend_persists_between_invocations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r2do_data.json");

        run_with(SnapshotStore::new(&path), &command(&["cat", "work"])).unwrap();
        run_with(SnapshotStore::new(&path), &command(&["task", "buy", "milk"])).unwrap();

        let lines = run_with(SnapshotStore::new(&path), &command(&["show"])).unwrap();
        assert_eq!(lines, vec!["* work"]);
        let lines = run_with(SnapshotStore::new(&path), &command(&["list"])).unwrap();
        assert!(lines.iter().any(|line| line.contains("buy milk")));
    }

    #[test]
    fn sqlite_backend_persists_between_invocations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r2do.sqlite3");

        for values in [&["cat", "work"][..], &["cat", "home"], &["cat", "work"]] {
            let conn = open_db(&path).unwrap();
            run_with(RelationalStore::try_new(&conn).unwrap(), &command(values)).unwrap();
        }

        let conn = open_db(&path).unwrap();
        let lines =
            run_with(RelationalStore::try_new(&conn).unwrap(), &command(&["show"])).unwrap();
        assert_eq!(lines, vec!["* work", "  home"]);
    }

    #[test]
    fn failed_command_still_saves_earlier_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r2do_data.json");
        run_with(SnapshotStore::new(&path), &command(&["cat", "work"])).unwrap();

        let err = run_with(SnapshotStore::new(&path), &command(&["rm", "missing"])).unwrap_err();
        assert!(matches!(err, CliError::State(_)));
        assert_eq!(err.to_string(), "category 'missing' not found");

        let lines = run_with(SnapshotStore::new(&path), &command(&["now"])).unwrap();
        assert_eq!(lines, vec!["work"]);
    }

    #[test]
    fn error_kind_is_a_fixed_code_without_user_text() {
        let cases = [
            (
                CliError::State(StateError::TaskNotFound("secret plan".to_string())),
                "task_not_found",
            ),
            (
                CliError::State(StateError::Validation(
                    ValidationError::DuplicateTaskDescription("secret plan".to_string()),
                )),
                "validation",
            ),
            (
                CliError::State(StateError::CategoryNotFound("secret plan".to_string())),
                "category_not_found",
            ),
            (
                CliError::State(StateError::CategoryAlreadyExists("secret plan".to_string())),
                "category_already_exists",
            ),
            (
                CliError::UnknownCommand("secret plan".to_string()),
                "unknown_command",
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.kind(), expected);
            assert!(!err.kind().contains("secret"));
        }
    }
}
