//! FILENAME: formula-engine/src/dataset.rs
//! PURPOSE: The tabular data model the evaluator executes against.
//! CONTEXT: A `Dataset` is an ordered sequence of rows sharing a declared
//! column schema; it is read-only during evaluation.

use std::collections::HashMap;

use crate::value::Value;

/// A single named column: a dense value sequence, one entry per row.
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Column { name: name.into(), values }
    }
}

/// A rectangular dataset: rows times named columns. Column lookups are
/// case-sensitive; there is no case-insensitive fallback mode.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    row_count: usize,
}

impl Dataset {
    /// Builds a dataset from a set of equal-length columns. Panics if the
    /// columns are not uniform in length or if a name is duplicated; both
    /// are programmer errors in how the dataset was assembled, not
    /// something a row of input data could trigger.
    pub fn new(columns: Vec<Column>) -> Self {
        let row_count = columns.first().map(|c| c.values.len()).unwrap_or(0);
        let mut index = HashMap::with_capacity(columns.len());

        for (i, col) in columns.iter().enumerate() {
            assert_eq!(col.values.len(), row_count, "column '{}' has a mismatched length", col.name);
            if index.insert(col.name.clone(), i).is_some() {
                panic!("duplicate column name '{}'", col.name);
            }
        }

        Dataset { columns, index, row_count }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    /// A column of all-Missing values, used when a reference cannot be
    /// resolved but the caller needs a full-length placeholder.
    pub fn missing_column(&self) -> Vec<Value> {
        vec![Value::Missing; self.row_count]
    }
}
