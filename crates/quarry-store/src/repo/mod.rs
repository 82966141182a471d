//! Repository layer
//!
//! `Session` is the synchronous typed CRUD surface used on the executor
//! thread; `Repository` wraps it in async calls with logging and change
//! notification.

pub mod repository;
pub mod session;

pub use repository::Repository;
pub use session::Session;
