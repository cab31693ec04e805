//! FILENAME: validation-core/src/error.rs
//! PURPOSE: Error taxonomy for rule execution and configuration loading.
//! CONTEXT: `ConfigError` aborts the whole analytic before evaluation
//! begins; `RuleError` fails only the rule that raised it, and is folded
//! by the aggregator into a missing contribution for that rule.

use thiserror::Error;

use formula_engine::EvalError;
use formula_parser::{LexError, ParseError};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuleError {
    #[error("lex error in formula: {0}")]
    Lex(#[from] LexError),

    #[error("parse error in formula: {0}")]
    Parse(#[from] ParseError),

    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error("rule '{rule}' is missing required parameter '{parameter}'")]
    MissingParameter { rule: String, parameter: String },

    #[error("rule '{rule}' parameter '{parameter}' has the wrong type: expected {expected}")]
    WrongParameterType { rule: String, parameter: String, expected: String },

    #[error("unknown built-in rule '{0}'")]
    UnknownRule(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("field '{field}' has the wrong type: expected {expected}")]
    WrongFieldType { field: String, expected: String },

    #[error("'validations' must contain at least one rule descriptor")]
    EmptyValidations,

    #[error("validations[{index}]: {source}")]
    InvalidRule { index: usize, source: Box<RuleError> },

    #[error("threshold '{field}' must be a number in 0..=100, found {value}")]
    ThresholdOutOfRange { field: String, value: f64 },

    #[error("column '{column}' referenced by rule '{rule}' is not declared in the data source's required columns")]
    UndeclaredColumn { rule: String, column: String },

    #[error("'reporting.group_by' references undeclared column '{0}'")]
    UndeclaredGroupColumn(String),
}
