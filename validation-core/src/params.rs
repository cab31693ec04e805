//! FILENAME: validation-core/src/params.rs
//! PURPOSE: Typed accessors over a rule descriptor's `parameters` bag.
//! CONTEXT: `RuleDescriptor::parameters` is a `serde_json::Value` (an
//! object) so that the configuration loader stays format-agnostic; these
//! helpers are the one place that turns "missing key" / "wrong type" into
//! the structured `RuleError` variants every rule needs.

use serde_json::Value as Json;

use crate::error::RuleError;

pub fn require_str(params: &Json, rule: &str, key: &str) -> Result<String, RuleError> {
    params
        .get(key)
        .and_then(Json::as_str)
        .map(str::to_string)
        .ok_or_else(|| RuleError::MissingParameter { rule: rule.to_string(), parameter: key.to_string() })
}

pub fn optional_str(params: &Json, key: &str) -> Option<String> {
    params.get(key).and_then(Json::as_str).map(str::to_string)
}

pub fn require_str_list(params: &Json, rule: &str, key: &str) -> Result<Vec<String>, RuleError> {
    let array = params
        .get(key)
        .and_then(Json::as_array)
        .ok_or_else(|| RuleError::MissingParameter { rule: rule.to_string(), parameter: key.to_string() })?;

    array
        .iter()
        .map(|v| {
            v.as_str().map(str::to_string).ok_or_else(|| RuleError::WrongParameterType {
                rule: rule.to_string(),
                parameter: key.to_string(),
                expected: "list of strings".to_string(),
            })
        })
        .collect()
}

/// Accepts a list of JSON scalars (string, number, or boolean) and renders
/// each to its text form, matching the evaluator's `Value::as_text`
/// convention — `enumeration_validation`'s `valid_values` is compared
/// against a row's value as text, so the comparison set is built the
/// same way.
pub fn require_scalar_list_as_text(params: &Json, rule: &str, key: &str) -> Result<Vec<String>, RuleError> {
    let array = params
        .get(key)
        .and_then(Json::as_array)
        .ok_or_else(|| RuleError::MissingParameter { rule: rule.to_string(), parameter: key.to_string() })?;

    array
        .iter()
        .map(|v| match v {
            Json::String(s) => Ok(s.clone()),
            Json::Number(n) => Ok(n.to_string()),
            Json::Bool(b) => Ok(if *b { "TRUE" } else { "FALSE" }.to_string()),
            _ => Err(RuleError::WrongParameterType {
                rule: rule.to_string(),
                parameter: key.to_string(),
                expected: "list of scalars".to_string(),
            }),
        })
        .collect()
}
