//! FILENAME: validation-core/src/rules.rs
//! PURPOSE: Built-in validation rule library (C5): named primitives that
//! desugar to a Boolean column, plus the `custom_formula` escape hatch that
//! routes through the formula frontend/evaluator (C1-C4).
//! CONTEXT: Each rule is a total function of `(dataset, parameters,
//! reference_data) -> Boolean column`. Parameters are validated against the
//! rule's signature before anything touches the dataset; a bad parameter
//! is a `RuleError`, never a panic.

use serde_json::Value as Json;

use formula_engine::{evaluate_as_boolean, Dataset, Value};
use formula_parser::parse;

use crate::error::RuleError;
use crate::params::{optional_str, require_scalar_list_as_text, require_str, require_str_list};
use crate::reference::ReferenceData;

/// The result of running one rule against a dataset: a full-length Boolean
/// (or Missing) column plus any non-fatal diagnostics gathered along the
/// way. Only `custom_formula` ever produces warnings; the structured
/// built-ins are total and deterministic.
#[derive(Debug, Clone)]
pub struct RuleOutcome {
    pub values: Vec<Value>,
    pub warnings: Vec<String>,
}

impl RuleOutcome {
    fn deterministic(values: Vec<Value>) -> Self {
        RuleOutcome { values, warnings: Vec::new() }
    }
}

/// The built-in rule names recognized by the resolver (C6). `Custom`
/// covers `custom_formula` (and any unrecognized name, which fails at
/// resolution time with `RuleError::UnknownRule`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    SegregationOfDuties,
    ApprovalSequence,
    TitleBasedApproval,
    ThirdPartyRiskValidation,
    EnumerationValidation,
    CustomFormula,
}

impl RuleKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "segregation_of_duties" => Some(RuleKind::SegregationOfDuties),
            "approval_sequence" => Some(RuleKind::ApprovalSequence),
            "title_based_approval" => Some(RuleKind::TitleBasedApproval),
            "third_party_risk_validation" => Some(RuleKind::ThirdPartyRiskValidation),
            "enumeration_validation" => Some(RuleKind::EnumerationValidation),
            "custom_formula" => Some(RuleKind::CustomFormula),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::SegregationOfDuties => "segregation_of_duties",
            RuleKind::ApprovalSequence => "approval_sequence",
            RuleKind::TitleBasedApproval => "title_based_approval",
            RuleKind::ThirdPartyRiskValidation => "third_party_risk_validation",
            RuleKind::EnumerationValidation => "enumeration_validation",
            RuleKind::CustomFormula => "custom_formula",
        }
    }
}

/// Checks that a rule descriptor names a known rule and carries every
/// parameter that rule's signature requires, without touching a dataset.
/// Used by the configuration loader (C8) to reject a bad descriptor before
/// any evaluation begins: parameters are validated up front so a typo in a
/// rule's configuration never surfaces mid-run as an evaluation failure.
pub fn validate_descriptor(descriptor: &crate::config::RuleDescriptor) -> Result<(), RuleError> {
    let rule = descriptor.rule.as_str();
    let params = &descriptor.parameters;
    let kind = RuleKind::from_name(rule).ok_or_else(|| RuleError::UnknownRule(rule.to_string()))?;

    match kind {
        RuleKind::SegregationOfDuties => {
            require_str(params, rule, "submitter_field")?;
            require_str_list(params, rule, "approver_fields")?;
        }
        RuleKind::ApprovalSequence => {
            let fields = require_str_list(params, rule, "date_fields_in_order")?;
            if fields.len() < 2 {
                return Err(RuleError::WrongParameterType {
                    rule: rule.to_string(),
                    parameter: "date_fields_in_order".to_string(),
                    expected: "at least 2 column names".to_string(),
                });
            }
        }
        RuleKind::TitleBasedApproval => {
            require_str(params, rule, "approver_field")?;
            require_str_list(params, rule, "allowed_titles")?;
            require_str(params, rule, "title_reference")?;
        }
        RuleKind::ThirdPartyRiskValidation => {
            require_str(params, rule, "third_party_field")?;
            require_str(params, rule, "risk_level_field")?;
        }
        RuleKind::EnumerationValidation => {
            require_str(params, rule, "field_name")?;
            require_scalar_list_as_text(params, rule, "valid_values")?;
        }
        RuleKind::CustomFormula => {
            let formula = require_str(params, rule, "original_formula")?;
            // Confirms the formula at least lexes/parses; a malformed
            // custom formula is rejected at configuration time rather
            // than surfacing only when the analytic runs.
            formula_parser::parse(&formula)?;
        }
    }

    Ok(())
}

/// Runs the rule named `rule_name` with `parameters` against `dataset`.
/// `reference` is consulted only by rules that need it (`title_based_approval`).
pub fn evaluate_rule(
    rule_name: &str,
    parameters: &Json,
    dataset: &Dataset,
    reference: Option<&ReferenceData>,
) -> Result<RuleOutcome, RuleError> {
    let kind = RuleKind::from_name(rule_name).ok_or_else(|| RuleError::UnknownRule(rule_name.to_string()))?;

    match kind {
        RuleKind::SegregationOfDuties => segregation_of_duties(parameters, dataset),
        RuleKind::ApprovalSequence => approval_sequence(parameters, dataset),
        RuleKind::TitleBasedApproval => title_based_approval(parameters, dataset, reference),
        RuleKind::ThirdPartyRiskValidation => third_party_risk_validation(parameters, dataset),
        RuleKind::EnumerationValidation => enumeration_validation(parameters, dataset),
        RuleKind::CustomFormula => custom_formula(parameters, dataset),
    }
}

fn column_or_missing(dataset: &Dataset, name: &str) -> Vec<Value> {
    dataset.column(name).map(|c| c.values.clone()).unwrap_or_else(|| dataset.missing_column())
}

fn trimmed_text(v: &Value) -> Option<String> {
    if v.is_missing() {
        None
    } else {
        Some(v.as_text().trim().to_string())
    }
}

/// `segregation_of_duties(submitter_field, approver_fields)`: true at row
/// *i* iff the submitter differs (trimmed, case-sensitive) from every
/// approver at row *i*. A missing submitter or approver is a violation,
/// not an indeterminate result — missing counts against the rule rather
/// than propagating as `Missing`.
fn segregation_of_duties(params: &Json, dataset: &Dataset) -> Result<RuleOutcome, RuleError> {
    const RULE: &str = "segregation_of_duties";
    let submitter_field = require_str(params, RULE, "submitter_field")?;
    let approver_fields = require_str_list(params, RULE, "approver_fields")?;

    let submitter = column_or_missing(dataset, &submitter_field);
    let approvers: Vec<Vec<Value>> = approver_fields.iter().map(|f| column_or_missing(dataset, f)).collect();

    let mut result = Vec::with_capacity(dataset.row_count());
    for row in 0..dataset.row_count() {
        let submitter_text = trimmed_text(&submitter[row]);
        let ok = match submitter_text {
            None => false,
            Some(sub) => approvers.iter().all(|col| match trimmed_text(&col[row]) {
                None => false,
                Some(app) => app != sub,
            }),
        };
        result.push(Value::Boolean(ok));
    }

    Ok(RuleOutcome::deterministic(result))
}

/// `approval_sequence(date_fields_in_order)`: true at row *i* iff the dates
/// named, read left to right, are non-strictly increasing. Any field that
/// doesn't resolve to a date (missing, or unparsable text) violates the rule.
fn approval_sequence(params: &Json, dataset: &Dataset) -> Result<RuleOutcome, RuleError> {
    const RULE: &str = "approval_sequence";
    let fields = require_str_list(params, RULE, "date_fields_in_order")?;
    if fields.len() < 2 {
        return Err(RuleError::WrongParameterType {
            rule: RULE.to_string(),
            parameter: "date_fields_in_order".to_string(),
            expected: "at least 2 column names".to_string(),
        });
    }

    let columns: Vec<Vec<Value>> = fields.iter().map(|f| column_or_missing(dataset, f)).collect();

    let mut result = Vec::with_capacity(dataset.row_count());
    for row in 0..dataset.row_count() {
        let dates: Option<Vec<_>> = columns.iter().map(|col| col[row].as_date()).collect();
        let ok = match dates {
            Some(ds) => ds.windows(2).all(|w| w[0] <= w[1]),
            None => false,
        };
        result.push(Value::Boolean(ok));
    }

    Ok(RuleOutcome::deterministic(result))
}

/// `title_based_approval(approver_field, allowed_titles, title_reference)`:
/// looks the approver up in the `title_reference` reference table and
/// checks membership in `allowed_titles`. A missing reference entry (table
/// absent, or approver not found in it) violates the rule.
fn title_based_approval(
    params: &Json,
    dataset: &Dataset,
    reference: Option<&ReferenceData>,
) -> Result<RuleOutcome, RuleError> {
    const RULE: &str = "title_based_approval";
    let approver_field = require_str(params, RULE, "approver_field")?;
    let allowed_titles = require_str_list(params, RULE, "allowed_titles")?;
    let title_reference = require_str(params, RULE, "title_reference")?;

    let approver = column_or_missing(dataset, &approver_field);

    let mut result = Vec::with_capacity(dataset.row_count());
    for row in 0..dataset.row_count() {
        let ok = match trimmed_text(&approver[row]) {
            None => false,
            Some(name) => match reference.and_then(|r| r.lookup(&title_reference, &name)) {
                Some(title) => allowed_titles.iter().any(|t| t == title),
                None => false,
            },
        };
        result.push(Value::Boolean(ok));
    }

    Ok(RuleOutcome::deterministic(result))
}

/// `third_party_risk_validation(third_party_field, risk_level_field)`: true
/// iff there's no third party on the row, or the risk level is recorded
/// and isn't the literal sentinel `"N/A"`.
fn third_party_risk_validation(params: &Json, dataset: &Dataset) -> Result<RuleOutcome, RuleError> {
    const RULE: &str = "third_party_risk_validation";
    let third_party_field = require_str(params, RULE, "third_party_field")?;
    let risk_level_field = require_str(params, RULE, "risk_level_field")?;

    let third_party = column_or_missing(dataset, &third_party_field);
    let risk_level = column_or_missing(dataset, &risk_level_field);

    let mut result = Vec::with_capacity(dataset.row_count());
    for row in 0..dataset.row_count() {
        let no_third_party = third_party[row].is_blank();
        let risk_recorded = !risk_level[row].is_blank() && risk_level[row].as_text() != "N/A";
        result.push(Value::Boolean(no_third_party || risk_recorded));
    }

    Ok(RuleOutcome::deterministic(result))
}

/// `enumeration_validation(field_name, valid_values)`: true iff the
/// field's text form is a member of `valid_values`. A missing field is
/// never a member of any enumeration.
fn enumeration_validation(params: &Json, dataset: &Dataset) -> Result<RuleOutcome, RuleError> {
    const RULE: &str = "enumeration_validation";
    let field_name = require_str(params, RULE, "field_name")?;
    let valid_values = require_scalar_list_as_text(params, RULE, "valid_values")?;

    let column = column_or_missing(dataset, &field_name);

    let result = column
        .iter()
        .map(|v| Value::Boolean(!v.is_missing() && valid_values.iter().any(|vv| vv == &v.as_text())))
        .collect();

    Ok(RuleOutcome::deterministic(result))
}

/// `custom_formula(original_formula, display_name?)`: parses and evaluates
/// the formula via C1-C4, coercing the top-level result to Boolean.
fn custom_formula(params: &Json, dataset: &Dataset) -> Result<RuleOutcome, RuleError> {
    const RULE: &str = "custom_formula";
    let formula = require_str(params, RULE, "original_formula")?;
    let _display_name = optional_str(params, "display_name");

    let ast = parse(&formula)?;
    let (values, warnings) = evaluate_as_boolean(&ast, dataset)?;

    Ok(RuleOutcome { values, warnings: warnings.iter().map(ToString::to_string).collect() })
}
