//! Quarry Engine - Orchestration layer
//!
//! Owns the database handle (configuration, executor and notifier
//! lifecycle, transactions) and the live subscriptions built on top of the
//! store's repositories.

pub mod config;
pub mod database;
pub mod live;

pub use config::DatabaseConfig;
pub use database::Database;
pub use live::{LiveQuery, LiveScope, LiveState, ObserverHandle};
