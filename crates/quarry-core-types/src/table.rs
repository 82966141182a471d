//! Strongly-typed table identifier
//!
//! The change notifier and live subscriptions key their state by table.
//! `TableId` keeps those keys distinct from arbitrary strings such as column
//! names or SQL fragments.

use std::sync::Arc;

/// Identifier of a single table in the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(Arc<str>);

impl TableId {
    /// Create a table identifier from its physical table name
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Physical table name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TableId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TableId {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_table_id_equality_is_by_name() {
        assert_eq!(TableId::new("items"), TableId::from("items".to_string()));
        assert_ne!(TableId::new("items"), TableId::new("orders"));
    }

    #[test]
    fn test_table_id_hashes_by_name() {
        let mut set = HashSet::new();
        set.insert(TableId::new("items"));
        set.insert(TableId::from("items"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_table_id_display() {
        assert_eq!(TableId::new("todo_items").to_string(), "todo_items");
    }
}
