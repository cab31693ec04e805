//! FILENAME: formula-parser/src/field_extractor.rs
//! PURPOSE: Enumerates the column names referenced by a formula.
//! CONTEXT: Used by configuration validation (C8) to check that every
//! column a rule touches is declared on the data source, without needing
//! a full evaluation pass.
//!
//! Two independent implementations are provided and are required to agree
//! on well-formed input:
//! - `extract_from_ast` walks a parsed `Expression` tree.
//! - `extract_from_text` runs a regex over the raw formula text, for
//!   quick-fail validation before a formula is even parsed.
//!
//! Both exclude the reserved-name table (function names and TRUE/FALSE)
//! and never mistake a function-name token for a column reference.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{Expression, RESERVED_NAMES};

/// Walks an AST collecting every `ColumnRef` name. Deterministic order
/// (`BTreeSet`) so callers can diff or display results stably.
pub fn extract_from_ast(expr: &Expression) -> BTreeSet<String> {
    let mut fields = BTreeSet::new();
    walk(expr, &mut fields);
    fields
}

fn walk(expr: &Expression, fields: &mut BTreeSet<String>) {
    match expr {
        Expression::Literal(_) => {}
        Expression::ColumnRef(name) => {
            fields.insert(name.clone());
        }
        Expression::Unary { operand, .. } => walk(operand, fields),
        Expression::Binary { left, right, .. } => {
            walk(left, fields);
            walk(right, fields);
        }
        Expression::FunctionCall { args, .. } => {
            for arg in args {
                walk(arg, fields);
            }
        }
        Expression::If { cond, then_branch, else_branch } => {
            walk(cond, fields);
            walk(then_branch, fields);
            walk(else_branch, fields);
        }
    }
}

// A bare identifier not immediately followed by `(` (ignoring whitespace),
// or a backtick-quoted identifier. The `(?:...)` lookahead approach isn't
// used here because `regex` (the crate) doesn't support lookahead; instead
// the function-name case is filtered out in a post-processing pass below.
static BARE_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").unwrap());
static QUOTED_IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"`((?:[^`]|``)*)`").unwrap());
static STRING_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r#""(?:[^"]|"")*""#).unwrap());

/// Regex-based extractor over raw formula text, used before a formula has
/// been parsed (e.g. rejecting a configuration up front). Masks out string
/// literals first so identifier-shaped text inside quotes is never mistaken
/// for a column reference.
pub fn extract_from_text(formula: &str) -> BTreeSet<String> {
    let body = formula.strip_prefix('=').unwrap_or(formula);

    let mut fields = BTreeSet::new();

    // Quoted identifiers: always a column reference regardless of the
    // reserved-name table (backticks are an explicit escape hatch).
    let mut masked = STRING_LITERAL.replace_all(body, |caps: &regex::Captures| {
        " ".repeat(caps[0].chars().count())
    }).into_owned();

    for cap in QUOTED_IDENTIFIER.captures_iter(&masked.clone()) {
        let name = cap[1].replace("``", "`");
        fields.insert(name);
    }

    // Blank out quoted-identifier spans too, so the bare-identifier pass
    // below doesn't also pick up their inner text.
    masked = QUOTED_IDENTIFIER
        .replace_all(&masked, |caps: &regex::Captures| " ".repeat(caps[0].chars().count()))
        .into_owned();

    let bytes = masked.as_bytes();
    for m in BARE_IDENTIFIER.find_iter(&masked) {
        let word = m.as_str();
        if word.eq_ignore_ascii_case("TRUE") || word.eq_ignore_ascii_case("FALSE") {
            continue;
        }
        if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(word)) {
            continue;
        }

        // Skip whitespace after the match to see if '(' follows immediately
        // in source terms (no intervening non-whitespace) — a function call.
        let mut idx = m.end();
        while idx < bytes.len() && (bytes[idx] as char).is_whitespace() {
            idx += 1;
        }
        if idx < bytes.len() && bytes[idx] == b'(' {
            continue;
        }

        fields.insert(word.to_string());
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn fields_via_both(formula: &str) -> (BTreeSet<String>, BTreeSet<String>) {
        let ast = parse(formula).expect("formula should parse");
        (extract_from_ast(&ast), extract_from_text(formula))
    }

    #[test]
    fn agrees_on_simple_comparison() {
        let (ast_fields, text_fields) = fields_via_both("Amount > 100");
        assert_eq!(ast_fields, text_fields);
        assert!(ast_fields.contains("Amount"));
    }

    #[test]
    fn excludes_function_names() {
        let (ast_fields, text_fields) = fields_via_both("ISBLANK(Submitter)");
        assert_eq!(ast_fields, text_fields);
        assert_eq!(ast_fields, BTreeSet::from(["Submitter".to_string()]));
    }

    #[test]
    fn handles_quoted_identifiers_with_spaces() {
        let (ast_fields, text_fields) = fields_via_both("`Submit Date` <= `Approval Date`");
        assert_eq!(ast_fields, text_fields);
        assert!(ast_fields.contains("Submit Date"));
        assert!(ast_fields.contains("Approval Date"));
    }

    #[test]
    fn ignores_identifier_shaped_text_inside_string_literals() {
        let (ast_fields, text_fields) = fields_via_both(r#"Status = "Approved""#);
        assert_eq!(ast_fields, text_fields);
        assert_eq!(ast_fields, BTreeSet::from(["Status".to_string()]));
    }

    #[test]
    fn excludes_true_false_keywords() {
        let (ast_fields, text_fields) = fields_via_both("IsFlagged = TRUE");
        assert_eq!(ast_fields, text_fields);
        assert_eq!(ast_fields, BTreeSet::from(["IsFlagged".to_string()]));
    }

    #[test]
    fn nested_function_calls_collect_all_column_refs() {
        let (ast_fields, text_fields) =
            fields_via_both("IF(ISBLANK(Approver), FALSE, COUNTIF(Risk, \">5\") > 0)");
        assert_eq!(ast_fields, text_fields);
        assert_eq!(
            ast_fields,
            BTreeSet::from(["Approver".to_string(), "Risk".to_string()])
        );
    }
}
