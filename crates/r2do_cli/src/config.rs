//! Startup configuration for the r2do shell.
//!
//! # Responsibility
//! - Resolve the home directory and the fixed data/log locations in it.
//! - Carry the storage backend chosen with `--store`.

use clap::ValueEnum;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

const SQLITE_FILE_NAME: &str = ".r2do.sqlite3";
const SNAPSHOT_FILE_NAME: &str = ".r2do_data.json";
const LOG_DIR_NAME: &str = ".r2do/logs";

/// Persistence strategy selected for this invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StoreBackend {
    /// Normalized SQLite store, written through on every mutation.
    #[default]
    #[value(alias = "relational")]
    Sqlite,
    /// Whole-graph JSON document, written once at exit when changed.
    #[value(alias = "json")]
    Snapshot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    HomeNotFound,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HomeNotFound => write!(f, "could not determine the home directory"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub home: PathBuf,
    pub backend: StoreBackend,
    pub log_level: &'static str,
}

impl AppConfig {
    /// Resolves configuration for `backend` under the user's home directory.
    pub fn resolve(backend: StoreBackend) -> Result<Self, ConfigError> {
        Self::from_parts(dirs::home_dir(), backend)
    }

    pub fn from_parts(home: Option<PathBuf>, backend: StoreBackend) -> Result<Self, ConfigError> {
        let home = home.ok_or(ConfigError::HomeNotFound)?;
        Ok(Self {
            home,
            backend,
            log_level: r2do_core::default_log_level(),
        })
    }

    /// Fixed data file for the selected backend.
    pub fn data_path(&self) -> PathBuf {
        match self.backend {
            StoreBackend::Sqlite => self.home.join(SQLITE_FILE_NAME),
            StoreBackend::Snapshot => self.home.join(SNAPSHOT_FILE_NAME),
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.home.join(LOG_DIR_NAME)
    }
}
