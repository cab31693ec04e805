//! FILENAME: formula-engine/src/error.rs
//! PURPOSE: Fatal evaluation error taxonomy.
//! CONTEXT: Coercion failures are non-fatal (see `warnings.rs`) and never
//! appear here; an `EvalError` aborts evaluation of the whole formula.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{func}' expects {expected} argument(s), found {found}")]
    WrongArgumentCount { func: String, expected: String, found: usize },

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("invalid COUNTIF criterion '{0}'")]
    InvalidCriterion(String),

    #[error("expression nesting depth exceeds the sandbox limit of {limit}")]
    RecursionLimitExceeded { limit: usize },
}
