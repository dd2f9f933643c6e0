//! Runtime configuration for hosts embedding the blog store.
//!
//! # Responsibility
//! - Collect database and logging settings from the environment or serde input.
//! - Turn them into an open `SqliteStore` and an active logger.
//!
//! # Invariants
//! - Missing settings fall back to defaults; an unset database path means an
//!   in-memory database.

use crate::db::DbResult;
use crate::logging::{default_log_level, init_logging};
use crate::store::SqliteStore;
use serde::Deserialize;
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "BLOGDB_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "BLOGDB_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "BLOGDB_LOG_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite file; `None` opens an in-memory database.
    pub db_path: Option<PathBuf>,
    pub log_level: String,
    /// Absolute log directory; `None` leaves logging to the host.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Reads `BLOGDB_DB_PATH`, `BLOGDB_LOG_LEVEL` and `BLOGDB_LOG_DIR`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env` with an injected variable source. Blank values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();
        Self {
            db_path: read(DB_PATH_ENV).map(PathBuf::from),
            log_level: read(LOG_LEVEL_ENV).unwrap_or(defaults.log_level),
            log_dir: read(LOG_DIR_ENV).map(PathBuf::from),
        }
    }

    /// Opens and migrates the configured database.
    pub fn open_store(&self) -> DbResult<SqliteStore> {
        match &self.db_path {
            Some(path) => SqliteStore::open(path),
            None => SqliteStore::open_in_memory(),
        }
    }

    /// Starts file logging when `log_dir` is set; a no-op otherwise.
    pub fn init_logging(&self) -> Result<(), String> {
        match &self.log_dir {
            Some(dir) => init_logging(&self.log_level, dir),
            None => Ok(()),
        }
    }
}
