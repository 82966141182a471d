//! Database connection management
//!
//! Provides utilities for opening and configuring SQLite connections

use crate::errors::{from_rusqlite, Result};
use rusqlite::Connection;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// SQLite journal mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    #[default]
    Wal,
    Delete,
    Memory,
}

impl JournalMode {
    pub fn as_pragma(&self) -> &'static str {
        match self {
            JournalMode::Wal => "WAL",
            JournalMode::Delete => "DELETE",
            JournalMode::Memory => "MEMORY",
        }
    }
}

/// Per-connection settings applied right after open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub foreign_keys: bool,
    pub journal_mode: JournalMode,
    pub busy_timeout: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            foreign_keys: true,
            journal_mode: JournalMode::Wal,
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

/// Open a SQLite database at the given path
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    Connection::open(path.as_ref()).map_err(|e| {
        from_rusqlite(e)
            .with_op("open")
            .with_message(format!("cannot open {}", path.as_ref().display()))
    })
}

/// Open an in-memory SQLite database
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(|e| from_rusqlite(e).with_op("open"))
}

/// Apply connection settings
///
/// The journal mode is left alone for in-memory databases, which only
/// support `MEMORY`.
pub fn configure(conn: &Connection, settings: &ConnectionSettings, in_memory: bool) -> Result<()> {
    let foreign_keys = if settings.foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {}", foreign_keys))
        .map_err(|e| from_rusqlite(e).with_op("configure"))?;

    if !in_memory {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = {}",
            settings.journal_mode.as_pragma()
        ))
        .map_err(|e| from_rusqlite(e).with_op("configure"))?;
    }

    conn.busy_timeout(settings.busy_timeout)
        .map_err(|e| from_rusqlite(e).with_op("configure"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configure_enables_foreign_keys() {
        let conn = open_in_memory().unwrap();
        configure(&conn, &ConnectionSettings::default(), true).unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_file_database_uses_wal() {
        let dir = tempfile::tempdir().unwrap();
        let conn = open(dir.path().join("quarry.db")).unwrap();
        configure(&conn, &ConnectionSettings::default(), false).unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[test]
    fn test_open_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = open(dir.path().join("missing").join("quarry.db")).unwrap_err();
        assert_eq!(
            err.kind(),
            quarry_core::errors::ExErrorKind::ConnectionFailed
        );
    }
}
