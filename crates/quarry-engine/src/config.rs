//! Database configuration
//!
//! Loaded from TOML, every field optional:
//!
//! ```toml
//! path = "quarry.db"
//! foreign_keys = true
//! journal_mode = "wal"
//! busy_timeout_ms = 5000
//! notifier_capacity = 64
//! ```

use quarry_core::errors::{ExError, ExErrorKind, Result};
use quarry_store::notify::DEFAULT_CAPACITY;
use quarry_store::{ConnectionSettings, JournalMode};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_DB_PATH: &str = "QUARRY_DB_PATH";
pub const ENV_BUSY_TIMEOUT_MS: &str = "QUARRY_BUSY_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database file; `None` opens a private in-memory database
    pub path: Option<PathBuf>,
    pub foreign_keys: bool,
    /// Ignored for in-memory databases
    pub journal_mode: JournalMode,
    pub busy_timeout_ms: u64,
    /// Per-table change buffer
    pub notifier_capacity: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            foreign_keys: true,
            journal_mode: JournalMode::Wal,
            busy_timeout_ms: 5000,
            notifier_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl DatabaseConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| {
            ExError::new(ExErrorKind::Configuration)
                .with_op("load_config")
                .with_message(format!("invalid database config: {}", e))
        })
    }

    /// Read and parse a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ExError::new(ExErrorKind::Io)
                .with_op("load_config")
                .with_message(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Apply `QUARRY_DB_PATH` and `QUARRY_BUSY_TIMEOUT_MS` from the process
    /// environment
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DB_PATH).filter(|p| !p.trim().is_empty()) {
            self.path = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup(ENV_BUSY_TIMEOUT_MS) {
            self.busy_timeout_ms = raw.trim().parse().map_err(|_| {
                ExError::new(ExErrorKind::Configuration)
                    .with_op("load_config")
                    .with_message(format!(
                        "{} must be a whole number of milliseconds, got {:?}",
                        ENV_BUSY_TIMEOUT_MS, raw
                    ))
            })?;
        }
        Ok(self)
    }

    pub fn is_in_memory(&self) -> bool {
        self.path.is_none()
    }

    pub fn to_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            foreign_keys: self.foreign_keys,
            journal_mode: self.journal_mode,
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }
}
