//! Per-table change notifier
//!
//! A registry of broadcast channels keyed by table. Events carry no
//! payload: a receiver learns only that its table changed and re-queries.
//! The notifier is owned by the database handle, created when the database
//! opens and torn down with `cleanup_all` when it closes.

use quarry_core_types::TableId;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;

/// Default per-table buffer; lagging receivers coalesce missed signals.
pub const DEFAULT_CAPACITY: usize = 64;

/// "This table changed"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableChanged;

/// Table-keyed publish/subscribe registry
#[derive(Debug)]
pub struct ChangeNotifier {
    capacity: usize,
    channels: Mutex<HashMap<TableId, broadcast::Sender<TableChanged>>>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to a table, creating its channel if needed
    ///
    /// The receiver sees every `notify` issued after this call returns.
    pub fn publisher(&self, table: &TableId) -> broadcast::Receiver<TableChanged> {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        match channels.get(table) {
            Some(sender) => sender.subscribe(),
            None => {
                let (sender, receiver) = broadcast::channel(self.capacity);
                channels.insert(table.clone(), sender);
                tracing::trace!(table = %table, "notifier channel created");
                receiver
            }
        }
    }

    /// Signal every current subscriber of `table`
    ///
    /// Returns the number of receivers reached. A table nobody listens to is
    /// a no-op; its idle channel is dropped.
    pub fn notify(&self, table: &TableId) -> usize {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = channels.get(table) else {
            return 0;
        };
        match sender.send(TableChanged) {
            Ok(reached) => {
                tracing::trace!(table = %table, reached, "table changed");
                reached
            }
            Err(_) => {
                channels.remove(table);
                0
            }
        }
    }

    /// Close and remove one table's channel
    ///
    /// Receivers observe the channel closing. Returns false if there was
    /// nothing to remove.
    pub fn cleanup(&self, table: &TableId) -> bool {
        let removed = self
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(table)
            .is_some();
        if removed {
            tracing::debug!(table = %table, "notifier channel closed");
        }
        removed
    }

    /// Close and remove every channel
    pub fn cleanup_all(&self) {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        let closed = channels.len();
        channels.clear();
        tracing::debug!(closed, "notifier channels closed");
    }

    pub fn is_registered(&self, table: &TableId) -> bool {
        self.channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(table)
    }

    /// Live receivers for `table`
    pub fn subscriber_count(&self, table: &TableId) -> usize {
        self.channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table)
            .map_or(0, broadcast::Sender::receiver_count)
    }
}
