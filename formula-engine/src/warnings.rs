//! FILENAME: formula-engine/src/warnings.rs
//! PURPOSE: Non-fatal diagnostics collected alongside an evaluation result.
//! CONTEXT: A coercion failure does not abort evaluation — the position
//! becomes Missing and a warning is recorded so callers (typically C6's
//! rule resolver) can surface data-quality issues without failing the run.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum DataWarning {
    /// A value at `row` could not be coerced to the type an operation
    /// required (e.g. a non-numeric string used in arithmetic).
    CoercionFailure { row: usize, context: String },

    /// The top-level result at `row` could not be coerced to Boolean for
    /// use as a validation outcome; it was treated as Missing.
    NonBooleanResult { row: usize },

    /// A chained comparison (`a < b < c`) was parsed as `(a < b) < c`,
    /// which is almost certainly not what the author intended. `formula`
    /// is the printed form of the inner `(a < b)` sub-expression that
    /// triggered the warning.
    NonChainingComparison { formula: String },
}

impl fmt::Display for DataWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataWarning::CoercionFailure { row, context } => {
                write!(f, "row {row}: coercion failure ({context})")
            }
            DataWarning::NonBooleanResult { row } => {
                write!(f, "row {row}: result could not be coerced to Boolean")
            }
            DataWarning::NonChainingComparison { formula } => {
                write!(f, "comparison operators do not chain in '{formula}'; verify intent")
            }
        }
    }
}
