//! FILENAME: validation-core/src/config.rs
//! PURPOSE: Configuration loader (C8): parses a configuration document and
//! enforces the structural invariants a rule resolver can rely on before
//! any rule is evaluated.
//! CONTEXT: `serde`-deserializable over `serde_json`, the same way every
//! on-disk document format in this codebase is modeled; JSON is the only
//! format this loader accepts directly.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::ConfigError;
use crate::reference::ReferenceData;
use crate::rules::RuleKind;

/// `analytic_id` may be authored as either a string or an integer; this
/// newtype absorbs that at deserialization time so every other component
/// sees a plain `String`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticId(pub String);

impl fmt::Display for AnalyticId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for AnalyticId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Json::deserialize(deserializer)?;
        match value {
            Json::String(s) => Ok(AnalyticId(s)),
            Json::Number(n) => Ok(AnalyticId(n.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "analytic_id must be a string or integer, found {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDescriptor {
    pub rule: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_parameters")]
    pub parameters: Json,
}

fn default_parameters() -> Json {
    Json::Object(Default::default())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thresholds {
    pub error_percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reporting {
    pub group_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    #[serde(alias = "required_fields", default)]
    pub required_columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    pub analytic_id: AnalyticId,
    pub analytic_name: String,
    #[serde(default)]
    pub analytic_description: Option<String>,
    #[serde(alias = "source")]
    pub data_source: DataSource,
    pub validations: Vec<RuleDescriptor>,
    pub thresholds: Thresholds,
    pub reporting: Reporting,
    #[serde(default)]
    pub reference_data: Option<ReferenceData>,
    #[serde(default)]
    pub report_metadata: Option<Json>,
}

impl Configuration {
    /// Parses a configuration document from JSON text and validates it.
    /// Failures in either step are surfaced uniformly as `ConfigError`.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Configuration = serde_json::from_str(text).map_err(classify_parse_error)?;
        config.validate()?;
        Ok(config)
    }

    /// Enforces the structural invariants a rule resolver can rely on:
    /// - `validations` is non-empty.
    /// - every rule descriptor names a known rule and supplies the
    ///   parameters that rule's signature requires.
    /// - `thresholds.error_percentage` is within `0..=100`.
    /// - every column a rule touches is declared as a required column.
    /// - `reporting.group_by` is itself a declared column.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.validations.is_empty() {
            return Err(ConfigError::EmptyValidations);
        }

        if !(0.0..=100.0).contains(&self.thresholds.error_percentage) {
            return Err(ConfigError::ThresholdOutOfRange {
                field: "thresholds.error_percentage".to_string(),
                value: self.thresholds.error_percentage,
            });
        }

        let declared: std::collections::BTreeSet<&str> =
            self.data_source.required_columns.iter().map(String::as_str).collect();

        for (index, descriptor) in self.validations.iter().enumerate() {
            crate::rules::validate_descriptor(descriptor).map_err(|source| ConfigError::InvalidRule {
                index,
                source: Box::new(source),
            })?;

            for column in referenced_columns(descriptor).map_err(|source| ConfigError::InvalidRule {
                index,
                source: Box::new(source),
            })? {
                if !declared.contains(column.as_str()) {
                    log::error!(
                        "configuration '{}' rejected: rule '{}' references undeclared column '{column}'",
                        self.analytic_id,
                        descriptor.rule
                    );
                    return Err(ConfigError::UndeclaredColumn { rule: descriptor.rule.clone(), column });
                }
            }
        }

        if !declared.contains(self.reporting.group_by.as_str()) {
            return Err(ConfigError::UndeclaredGroupColumn(self.reporting.group_by.clone()));
        }

        Ok(())
    }
}

/// Turns a `serde_json` deserialization failure into a `ConfigError`,
/// recovering the missing field's name when that's what failed so callers
/// see `MissingField` instead of the generic `WrongFieldType`.
fn classify_parse_error(err: serde_json::Error) -> ConfigError {
    let message = err.to_string();
    if let Some(start) = message.find("missing field `") {
        let rest = &message[start + "missing field `".len()..];
        if let Some(end) = rest.find('`') {
            return ConfigError::MissingField(rest[..end].to_string());
        }
    }
    ConfigError::WrongFieldType { field: "<root>".to_string(), expected: message }
}

/// Enumerates the columns a single rule descriptor touches, the way C3's
/// field extractor does for a raw formula — used by `validate` to check
/// every referenced column is declared on the data source.
fn referenced_columns(descriptor: &RuleDescriptor) -> Result<Vec<String>, crate::error::RuleError> {
    use crate::params::{require_str, require_str_list};

    let rule = descriptor.rule.as_str();
    let params = &descriptor.parameters;

    let columns = match RuleKind::from_name(rule) {
        Some(RuleKind::SegregationOfDuties) => {
            let mut cols = vec![require_str(params, rule, "submitter_field")?];
            cols.extend(require_str_list(params, rule, "approver_fields")?);
            cols
        }
        Some(RuleKind::ApprovalSequence) => require_str_list(params, rule, "date_fields_in_order")?,
        Some(RuleKind::TitleBasedApproval) => vec![require_str(params, rule, "approver_field")?],
        Some(RuleKind::ThirdPartyRiskValidation) => {
            vec![require_str(params, rule, "third_party_field")?, require_str(params, rule, "risk_level_field")?]
        }
        Some(RuleKind::EnumerationValidation) => vec![require_str(params, rule, "field_name")?],
        Some(RuleKind::CustomFormula) => {
            let formula = require_str(params, rule, "original_formula")?;
            formula_parser::extract_from_text(&formula).into_iter().collect()
        }
        None => return Err(crate::error::RuleError::UnknownRule(rule.to_string())),
    };

    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config_json(rule_json: &str, group_by: &str, required: &str) -> String {
        format!(
            r#"{{
                "analytic_id": 42,
                "analytic_name": "Segregation of Duties",
                "data_source": {{"required_columns": {required}}},
                "validations": [{rule_json}],
                "thresholds": {{"error_percentage": 5.0}},
                "reporting": {{"group_by": "{group_by}"}}
            }}"#
        )
    }

    #[test]
    fn analytic_id_accepts_integer_and_renders_as_string() {
        let json = base_config_json(
            r#"{"rule": "segregation_of_duties", "description": "SoD", "parameters": {"submitter_field": "S", "approver_fields": ["A"]}}"#,
            "Region",
            r#"["S", "A", "Region"]"#,
        );
        let config = Configuration::from_json(&json).unwrap();
        assert_eq!(config.analytic_id.0, "42");
    }

    #[test]
    fn rejects_empty_validations() {
        let json = r#"{
            "analytic_id": "A1",
            "analytic_name": "Empty",
            "data_source": {"required_columns": []},
            "validations": [],
            "thresholds": {"error_percentage": 5.0},
            "reporting": {"group_by": "Region"}
        }"#;
        let err = Configuration::from_json(json).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyValidations));
    }

    #[test]
    fn rejects_threshold_out_of_range() {
        let json = r#"{
            "analytic_id": "A1",
            "analytic_name": "Bad threshold",
            "data_source": {"required_columns": ["Region"]},
            "validations": [{"rule": "enumeration_validation", "description": "d", "parameters": {"field_name": "Region", "valid_values": ["A"]}}],
            "thresholds": {"error_percentage": 150.0},
            "reporting": {"group_by": "Region"}
        }"#;
        let err = Configuration::from_json(json).unwrap_err();
        assert!(matches!(err, ConfigError::ThresholdOutOfRange { .. }));
    }

    #[test]
    fn rejects_undeclared_column_referenced_by_rule() {
        let json = base_config_json(
            r#"{"rule": "segregation_of_duties", "description": "SoD", "parameters": {"submitter_field": "S", "approver_fields": ["A"]}}"#,
            "Region",
            r#"["S", "Region"]"#,
        );
        let err = Configuration::from_json(&json).unwrap_err();
        assert!(matches!(err, ConfigError::UndeclaredColumn { column, .. } if column == "A"));
    }

    #[test]
    fn rejects_undeclared_group_by_column() {
        let json = base_config_json(
            r#"{"rule": "segregation_of_duties", "description": "SoD", "parameters": {"submitter_field": "S", "approver_fields": ["A"]}}"#,
            "Region",
            r#"["S", "A"]"#,
        );
        let err = Configuration::from_json(&json).unwrap_err();
        assert!(matches!(err, ConfigError::UndeclaredGroupColumn(col) if col == "Region"));
    }

    #[test]
    fn custom_formula_columns_are_extracted_from_the_formula_text() {
        let json = base_config_json(
            r#"{"rule": "custom_formula", "description": "custom", "parameters": {"original_formula": "`Submit Date` <= `TL Date`"}}"#,
            "Region",
            r#"["Submit Date", "TL Date", "Region"]"#,
        );
        assert!(Configuration::from_json(&json).is_ok());
    }

    #[test]
    fn missing_required_field_is_reported_by_name() {
        let json = r#"{
            "analytic_id": "A1",
            "data_source": {"required_columns": ["Region"]},
            "validations": [{"rule": "enumeration_validation", "description": "d", "parameters": {"field_name": "Region", "valid_values": ["A"]}}],
            "thresholds": {"error_percentage": 5.0},
            "reporting": {"group_by": "Region"}
        }"#;
        let err = Configuration::from_json(json).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(field) if field == "analytic_name"));
    }

    #[test]
    fn unknown_rule_name_is_rejected() {
        let json = base_config_json(
            r#"{"rule": "not_a_rule", "description": "?", "parameters": {}}"#,
            "Region",
            r#"["Region"]"#,
        );
        let err = Configuration::from_json(&json).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRule { .. }));
    }
}
