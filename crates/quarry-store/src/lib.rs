//! quarry store: execution against SQLite
//!
//! Provides:
//! - Connection open/configure and rusqlite error classification
//! - The `StorageEngine` boundary and its SQLite implementation
//! - A single-thread executor serializing every statement
//! - The per-table change notifier
//! - Typed CRUD: the synchronous `Session` and the async `Repository`

pub mod db;
pub mod engine;
pub mod errors;
pub mod executor;
pub mod notify;
pub mod repo;

pub use db::{ConnectionSettings, JournalMode};
pub use engine::{SqliteEngine, StorageEngine};
pub use errors::Result;
pub use executor::Executor;
pub use notify::{ChangeNotifier, TableChanged};
pub use repo::{Repository, Session};
