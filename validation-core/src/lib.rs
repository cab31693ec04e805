//! FILENAME: validation-core/src/lib.rs
//! PURPOSE: Public interface for the validation/aggregation pipeline:
//! configuration loading (C8), the built-in rule library (C5), the rule
//! resolver & row aggregator (C6), and the grouper & threshold judge (C7).
//! CONTEXT: This crate is the orchestrator. It depends on `formula-parser`
//! and `formula-engine` for everything formula-shaped (C1-C4) and owns
//! everything specific to the validation domain.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod grouper;
pub mod params;
pub mod reference;
pub mod rules;

pub use aggregator::{aggregate, AggregationResult, RowVerdict, RuleFailure};
pub use config::{AnalyticId, Configuration, DataSource, Reporting, RuleDescriptor, Thresholds};
pub use error::{ConfigError, RuleError};
pub use grouper::{group_and_judge, GroupSummary, GroupedReport};
pub use reference::ReferenceData;
pub use rules::{evaluate_rule, RuleKind, RuleOutcome};

use formula_engine::Dataset;

/// The full result of running one analytic against one dataset: the
/// per-row verdicts, the grouped/threshold-judged report, and whatever
/// non-fatal warnings and rule failures were collected along the way.
#[derive(Debug, Clone)]
pub struct AnalyticReport {
    pub analytic_id: AnalyticId,
    pub row_verdicts: Vec<RowVerdict>,
    pub grouped: GroupedReport,
    pub warnings: Vec<String>,
    pub rule_failures: Vec<RuleFailure>,
}

/// Runs one analytic end to end: resolves every rule in `config` against
/// `dataset` (C5/C6), then groups and judges the result (C7).
/// `config` must already have passed `Configuration::validate` — this
/// function does not re-validate, and a rejected configuration never
/// reaches this point; that abort happens at load time, via
/// `Configuration::from_json`/`validate`.
pub fn run_analytic(config: &Configuration, dataset: &Dataset) -> AnalyticReport {
    let aggregation = aggregate(config, dataset, config.reference_data.as_ref());
    let grouped = group_and_judge(
        dataset,
        &config.reporting.group_by,
        &aggregation.row_verdicts,
        config.thresholds.error_percentage,
    );

    AnalyticReport {
        analytic_id: config.analytic_id.clone(),
        row_verdicts: aggregation.row_verdicts,
        grouped,
        warnings: aggregation.warnings,
        rule_failures: aggregation.rule_failures,
    }
}
