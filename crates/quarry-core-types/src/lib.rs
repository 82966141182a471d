//! Core types shared across quarry crates
//!
//! This crate provides foundational types used by the error facility, the
//! logging facility and the change notifier:
//!
//! - **Correlation types**: RequestId
//! - **Table identity**: TableId
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;
pub mod table;

pub use correlation::RequestId;
pub use table::TableId;
