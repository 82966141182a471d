//! Live subscriptions
//!
//! A live query holds the latest result of one repository query and
//! re-runs it every time the change notifier signals the query's table.
//! It registers with the notifier before its initial load, so a change
//! that commits while the load is in flight is picked up by the load itself
//! or by the re-fetch that follows.

mod observer;
mod state;
mod subscription;

pub use observer::ObserverHandle;
pub use state::LiveState;
pub use subscription::{LiveQuery, LiveScope};
