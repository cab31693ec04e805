//! FILENAME: validation-core/src/reference.rs
//! PURPOSE: Reference-data tables consulted by built-in rules that need a
//! lookup outside the row itself (e.g. `title_based_approval`'s approver ->
//! title mapping).
//! CONTEXT: Populated from a configuration's optional `reference_data`
//! block and passed alongside the `Dataset` at rule-evaluation time.
//! Freshness tracking of the underlying source is the caller's concern,
//! not this crate's.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A named set of lookup tables, each mapping a key (e.g. an approver name)
/// to a value (e.g. that approver's title).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceData {
    #[serde(flatten)]
    tables: HashMap<String, IndexMap<String, String>>,
}

impl ReferenceData {
    pub fn new() -> Self {
        ReferenceData::default()
    }

    pub fn with_table(mut self, name: impl Into<String>, table: IndexMap<String, String>) -> Self {
        self.tables.insert(name.into(), table);
        self
    }

    /// Looks up `key` in the table named `table`. Returns `None` both when
    /// the table itself is absent and when the key has no entry in it —
    /// callers that need to distinguish the two don't arise in this rule
    /// set (a missing table and a missing entry both mean "violation").
    pub fn lookup(&self, table: &str, key: &str) -> Option<&str> {
        self.tables.get(table)?.get(key).map(String::as_str)
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_missing_table_and_missing_key_both_yield_none() {
        let mut titles = IndexMap::new();
        titles.insert("Alice".to_string(), "Director".to_string());
        let data = ReferenceData::new().with_table("titles", titles);

        assert_eq!(data.lookup("titles", "Alice"), Some("Director"));
        assert_eq!(data.lookup("titles", "Bob"), None);
        assert_eq!(data.lookup("no_such_table", "Alice"), None);
    }
}
