//! Runtime configuration for hosts embedding the data-access layer.
//!
//! Values come from serde-deserialized settings or from `BOOKSMART_*`
//! environment variables; anything unset keeps its default.

use crate::codec::{IdCodec, UUID_SUBTYPE};
use crate::db::{
    open_db_in_memory_with_timeout, open_db_with_timeout, DbResult, DEFAULT_BUSY_TIMEOUT,
};
use crate::logging::default_log_level;
use rusqlite::Connection;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "BOOKSMART_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "BOOKSMART_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "BOOKSMART_LOG_DIR";
pub const ENV_BUSY_TIMEOUT_MS: &str = "BOOKSMART_BUSY_TIMEOUT_MS";

/// Configuration value that could not be accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid value `{value}` for {key}: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite file; `None` opens a private in-memory database.
    pub database_path: Option<PathBuf>,
    pub log_level: String,
    /// Rolling log directory; `None` leaves logging to the host.
    pub log_dir: Option<PathBuf>,
    pub busy_timeout_ms: u64,
    /// Binary subtype used for UUID identifiers.
    pub id_subtype: u8,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            busy_timeout_ms: u64::try_from(DEFAULT_BUSY_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
            id_subtype: UUID_SUBTYPE,
        }
    }
}

impl CoreConfig {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Applies overrides returned by `lookup` on top of the defaults.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(path) = read(ENV_DB_PATH) {
            config.database_path = Some(PathBuf::from(path));
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level.trim().to_string();
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = read(ENV_BUSY_TIMEOUT_MS) {
            config.busy_timeout_ms =
                raw.trim()
                    .parse::<u64>()
                    .map_err(|err| ConfigError::InvalidValue {
                        key: ENV_BUSY_TIMEOUT_MS,
                        value: raw.clone(),
                        reason: err.to_string(),
                    })?;
        }

        Ok(config)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn codec(&self) -> IdCodec {
        IdCodec::with_subtype(self.id_subtype)
    }

    /// Opens and migrates the configured database; in memory when no path is set.
    pub fn open_db(&self) -> DbResult<Connection> {
        match &self.database_path {
            Some(path) => open_db_with_timeout(path, self.busy_timeout()),
            None => open_db_in_memory_with_timeout(self.busy_timeout()),
        }
    }
}
