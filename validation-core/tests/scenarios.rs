//! Integration tests for end-to-end concrete scenarios that span the
//! configuration loader, rule library, aggregator, and grouper together
//! (rather than any single crate in isolation).

use chrono::NaiveDate;
use proptest::prelude::*;

use formula_engine::{Column, Dataset, Value};
use validation_core::{aggregate, group_and_judge, Configuration, RowVerdict};

fn date(y: i32, m: u32, d: u32) -> Value {
    Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

#[test]
fn s3_custom_formula_as_a_configured_rule() {
    let json = r#"{
        "analytic_id": "S3",
        "analytic_name": "Submitter present and timely",
        "data_source": {"required_columns": ["Submitter", "Submit Date", "TL Date"]},
        "validations": [
            {"rule": "custom_formula", "description": "submitter present and on time",
             "parameters": {"original_formula": "AND(NOT(ISBLANK(`Submitter`)), `Submit Date` <= `TL Date`)"}}
        ],
        "thresholds": {"error_percentage": 0.0},
        "reporting": {"group_by": "Submitter"}
    }"#;
    let config = Configuration::from_json(json).unwrap();

    let dataset = Dataset::new(vec![
        Column::new(
            "Submitter",
            vec![Value::Text("Alice".into()), Value::Missing, Value::Text("Alice".into())],
        ),
        Column::new("Submit Date", vec![date(2024, 1, 1), date(2024, 1, 1), date(2024, 1, 5)]),
        Column::new("TL Date", vec![date(2024, 1, 2), date(2024, 1, 2), date(2024, 1, 2)]),
    ]);

    let result = aggregate(&config, &dataset, None);
    assert_eq!(result.row_verdicts, vec![RowVerdict::Gc, RowVerdict::Dnc, RowVerdict::Dnc]);
    assert!(result.rule_failures.is_empty());
}

#[test]
fn s6_field_extraction_matches_rule_resolution() {
    // Exercises the same extraction path the configuration loader uses
    // (C3's text-based extractor) against a formula mixing a blank-check
    // comparison with a function call over a backtick-quoted column.
    let fields =
        formula_parser::extract_from_text(r#"`Third Party Vendors`<>"" AND ISNUMBER(`Risk Rating`)"#);
    assert_eq!(
        fields,
        std::collections::BTreeSet::from(["Third Party Vendors".to_string(), "Risk Rating".to_string()])
    );
}

#[test]
fn boundary_single_row_dataset() {
    let json = r#"{
        "analytic_id": "single",
        "analytic_name": "Single row",
        "data_source": {"required_columns": ["Status", "Region"]},
        "validations": [
            {"rule": "enumeration_validation", "description": "status", "parameters": {"field_name": "Status", "valid_values": ["Open"]}}
        ],
        "thresholds": {"error_percentage": 0.0},
        "reporting": {"group_by": "Region"}
    }"#;
    let config = Configuration::from_json(json).unwrap();
    let dataset = Dataset::new(vec![
        Column::new("Status", vec![Value::Text("Open".into())]),
        Column::new("Region", vec![Value::Text("A".into())]),
    ]);

    let result = aggregate(&config, &dataset, None);
    let grouped = group_and_judge(&dataset, "Region", &result.row_verdicts, config.thresholds.error_percentage);

    assert_eq!(result.row_verdicts, vec![RowVerdict::Gc]);
    assert_eq!(grouped.overall_verdict, RowVerdict::Gc);
}

fn dataset_with_groups(group_sizes: &[(String, usize)]) -> (Dataset, Vec<RowVerdict>) {
    let mut groups = Vec::new();
    let mut verdicts = Vec::new();
    for (i, (name, size)) in group_sizes.iter().enumerate() {
        for j in 0..*size {
            groups.push(Value::Text(name.clone()));
            // Deterministic mix so every group sees all three verdicts at
            // least once for larger sizes, without needing randomness.
            verdicts.push(match (i + j) % 3 {
                0 => RowVerdict::Gc,
                1 => RowVerdict::Pc,
                _ => RowVerdict::Dnc,
            });
        }
    }
    (Dataset::new(vec![Column::new("Group", groups)]), verdicts)
}

proptest! {
    /// Grouper conservation: total rows across groups equals the dataset
    /// size, and GC+PC+DNC = Total per group.
    #[test]
    fn grouper_conserves_row_counts(sizes in prop::collection::vec(1usize..12, 1..6)) {
        let named: Vec<(String, usize)> = sizes.iter().enumerate().map(|(i, s)| (format!("G{i}"), *s)).collect();
        let (dataset, verdicts) = dataset_with_groups(&named);
        let report = group_and_judge(&dataset, "Group", &verdicts, 10.0);

        let total_rows: usize = named.iter().map(|(_, s)| s).sum();
        let summed: usize = report.groups.iter().map(|g| g.total).sum();
        prop_assert_eq!(summed, total_rows);

        for g in &report.groups {
            prop_assert_eq!(g.gc + g.pc + g.dnc, g.total);
        }
    }
}
