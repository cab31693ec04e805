//! Integration tests covering the parser's resilience against arbitrary
//! input and the field-extraction agreement invariant across a wider
//! corpus of formulas than the in-module unit tests.

use formula_parser::{extract_from_ast, extract_from_text, parse};
use proptest::prelude::*;

#[test]
fn leading_equals_sign_is_optional() {
    let with_sign = parse("=Amount > 10").unwrap();
    let without_sign = parse("Amount > 10").unwrap();
    assert_eq!(with_sign, without_sign);
}

#[test]
fn rejects_unterminated_quoted_identifier() {
    assert!(parse("`Submit Date > 1").is_err());
}

#[test]
fn rejects_mismatched_parentheses() {
    assert!(parse("(Amount > 10").is_err());
    assert!(parse("Amount > 10)").is_err());
}

#[test]
fn rejects_trailing_comma_in_call() {
    assert!(parse("ISBLANK(Amount,)").is_err());
}

#[test]
fn non_chaining_comparison_parses_left_associatively() {
    // `a < b < c` parses as `(a < b) < c`, not rejected at parse time.
    let expr = parse("A < B < C");
    assert!(expr.is_ok());
}

fn column_name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_]{0,8}"
}

#[test]
fn printer_roundtrip_preserves_structure_across_a_sample_of_formulas() {
    let formulas = [
        "A + 1 = B * 2",
        r#"IF(Amount > 100, "high", "low")"#,
        "`Submit Date` <= `TL Date`",
        "NOT(ISBLANK(Submitter)) AND A <> B",
        r#"COUNTIF(Risk, ">5") > 0 OR Status = "Approved""#,
        "-A * (B - C) & \"x\"",
        "NOT A",
        "NOT A AND NOT B",
    ];
    for formula in formulas {
        let ast = parse(formula).expect("fixture formula should parse");
        let printed = ast.to_string();
        let reparsed = parse(&printed).unwrap_or_else(|e| panic!("printed form '{printed}' failed to reparse: {e}"));
        assert_eq!(ast, reparsed, "round-trip mismatch for '{formula}' -> '{printed}'");
    }
}

proptest! {
    /// Printer -> parser round-trip: for every AST the parser builds,
    /// printing it and parsing the result again yields a structurally
    /// equal AST (modulo parenthesisation, which the printer normalizes
    /// away by always parenthesizing).
    #[test]
    fn printer_roundtrip_agrees_on_generated_formulas(
        left in column_name_strategy(),
        right in column_name_strategy(),
        n in 0.0f64..1000.0,
    ) {
        let formula = format!("IF({left} > {n}, {right} & \"x\", NOT({left} <= {n}))");
        if let Ok(ast) = parse(&formula) {
            let printed = ast.to_string();
            let reparsed = parse(&printed).expect("printed form must reparse");
            prop_assert_eq!(ast, reparsed);
        }
    }

    /// For any formula built from simple comparisons over generated column
    /// names, the AST-walk and regex-based field extractors must agree.
    #[test]
    fn field_extraction_agrees_on_generated_formulas(
        left in column_name_strategy(),
        right in column_name_strategy(),
        n in 0.0f64..1000.0,
    ) {
        let formula = format!("{left} > {n} AND {right} <> \"N/A\"");
        if let Ok(ast) = parse(&formula) {
            let ast_fields = extract_from_ast(&ast);
            let text_fields = extract_from_text(&formula);
            prop_assert_eq!(ast_fields, text_fields);
        }
    }

    /// Parsing must never panic on arbitrary printable input.
    #[test]
    fn parser_never_panics(input in "\\PC{0,40}") {
        let _ = parse(&input);
    }
}
