//! FILENAME: formula-engine/src/value.rs
//! PURPOSE: Defines the `Value` type: the evaluator's unit of exchange.
//! CONTEXT: A Value column is a dense `Vec<Value>` with length equal to the
//! dataset's row count. Missing is first-class and propagates through
//! arithmetic, comparison, and logical operations per the coercion rules
//! implemented in `evaluator.rs`.

use chrono::NaiveDate;

/// A single cell's value as seen by the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Boolean(bool),
    Date(NaiveDate),
    /// Absent value: missing source data, or the product of a failed
    /// coercion earlier in an expression. Propagates through most
    /// operators rather than raising an exception.
    Missing,
}

impl Value {
    /// Coerces to a number. Strings parse if they look like a plain
    /// number; anything else (including Missing) yields `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            Value::Date(_) | Value::Missing => None,
        }
    }

    /// Coerces to a Boolean. Only an actual Boolean, or the text "TRUE"/
    /// "FALSE" (case-insensitive), coerce cleanly.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            Value::Text(s) => match s.trim().to_uppercase().as_str() {
                "TRUE" => Some(true),
                "FALSE" => Some(false),
                _ => None,
            },
            Value::Number(_) | Value::Date(_) | Value::Missing => None,
        }
    }

    /// Coerces to a date, either directly or by parsing an ISO-8601 string.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
            Value::Number(_) | Value::Boolean(_) | Value::Missing => None,
        }
    }

    /// String representation used by `&` concatenation and text functions.
    /// Missing renders as the empty string.
    pub fn as_text(&self) -> String {
        match self {
            Value::Number(n) => format_number(*n),
            Value::Text(s) => s.clone(),
            Value::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Missing => String::new(),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// True iff the value is missing or an empty (after no trimming, per
    /// spreadsheet convention) string — the rule behind `ISBLANK`.
    pub fn is_blank(&self) -> bool {
        matches!(self, Value::Missing) || matches!(self, Value::Text(s) if s.is_empty())
    }

    /// True iff the value is already numeric, or parses cleanly as one —
    /// the rule behind `ISNUMBER`. Does not accept Boolean coercion, unlike
    /// `as_number`, because `ISNUMBER(TRUE)` is false in the dialect.
    pub fn is_number_like(&self) -> bool {
        match self {
            Value::Number(n) => n.is_finite(),
            Value::Text(s) => s.trim().parse::<f64>().is_ok(),
            Value::Boolean(_) | Value::Date(_) | Value::Missing => false,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
