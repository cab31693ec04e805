//! FILENAME: validation-core/src/aggregator.rs
//! PURPOSE: Rule resolver & row aggregator (C6): runs every rule in a
//! configuration against a dataset and combines the per-rule Boolean
//! columns into a per-row verdict.
//! CONTEXT: A rule-level fatal error (lex/parse/eval) fails only that
//! rule — its contribution to every row becomes `Missing` and the
//! analytic continues with whatever rules remain.

use formula_engine::{Dataset, Value};
use log::warn;

use crate::config::Configuration;
use crate::error::RuleError;
use crate::reference::ReferenceData;
use crate::rules::evaluate_rule;

/// Per-row classification: `GC` when every rule held, `DNC` when every rule
/// failed, `PC` otherwise (including any row where a rule contributed
/// `Missing`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RowVerdict {
    /// Generally Conforms.
    Gc,
    /// Partially Conforms.
    Pc,
    /// Does Not Conform.
    Dnc,
}

impl std::fmt::Display for RowVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowVerdict::Gc => write!(f, "GC"),
            RowVerdict::Pc => write!(f, "PC"),
            RowVerdict::Dnc => write!(f, "DNC"),
        }
    }
}

/// Records that one rule failed fatally during resolution. The aggregator
/// still produces a verdict for every row (that rule's contribution is
/// `Missing` everywhere); this lets callers learn why a row degraded to
/// `PC` instead of only seeing the degraded verdict.
#[derive(Debug, Clone)]
pub struct RuleFailure {
    pub rule_index: usize,
    pub rule_description: String,
    pub error: RuleError,
}

/// The outcome of running every rule in a configuration against a dataset.
#[derive(Debug, Clone)]
pub struct AggregationResult {
    pub row_verdicts: Vec<RowVerdict>,
    pub rule_columns: Vec<Vec<Value>>,
    pub warnings: Vec<String>,
    pub rule_failures: Vec<RuleFailure>,
}

/// Runs every rule in `config.validations` against `dataset`, then folds
/// the per-rule Boolean columns into one verdict per row.
pub fn aggregate(
    config: &Configuration,
    dataset: &Dataset,
    reference: Option<&ReferenceData>,
) -> AggregationResult {
    let row_count = dataset.row_count();
    let mut rule_columns = Vec::with_capacity(config.validations.len());
    let mut warnings = Vec::new();
    let mut rule_failures = Vec::new();

    for (index, descriptor) in config.validations.iter().enumerate() {
        match evaluate_rule(&descriptor.rule, &descriptor.parameters, dataset, reference) {
            Ok(outcome) => {
                warnings.extend(outcome.warnings);
                rule_columns.push(outcome.values);
            }
            Err(error) => {
                warn!(
                    "rule '{}' ({}) failed and is treated as missing for every row: {error}",
                    descriptor.rule, descriptor.description
                );
                rule_failures.push(RuleFailure {
                    rule_index: index,
                    rule_description: descriptor.description.clone(),
                    error,
                });
                rule_columns.push(vec![Value::Missing; row_count]);
            }
        }
    }

    let row_verdicts = (0..row_count).map(|row| verdict_for_row(&rule_columns, row)).collect();

    AggregationResult { row_verdicts, rule_columns, warnings, rule_failures }
}

fn verdict_for_row(rule_columns: &[Vec<Value>], row: usize) -> RowVerdict {
    let mut has_true = false;
    let mut has_false = false;
    let mut has_missing = false;

    for column in rule_columns {
        match &column[row] {
            Value::Boolean(true) => has_true = true,
            Value::Boolean(false) => has_false = true,
            // A rule is expected to have already coerced to Boolean or
            // Missing; anything else reaching here is treated the same as
            // Missing rather than panicking on a malformed rule output.
            _ => has_missing = true,
        }
    }

    if has_missing {
        RowVerdict::Pc
    } else if has_true && has_false {
        RowVerdict::Pc
    } else if has_true {
        RowVerdict::Gc
    } else {
        RowVerdict::Dnc
    }
}
