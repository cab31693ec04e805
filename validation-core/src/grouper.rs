//! FILENAME: validation-core/src/grouper.rs
//! PURPOSE: Grouper & threshold judge (C7): groups row verdicts by a
//! configured column and compares each group's non-conformance percentage
//! against the configured threshold.
//! CONTEXT: Group order is the insertion order of first occurrence of each
//! group key; `indexmap::IndexMap` gives that for free instead of a
//! parallel `Vec<String>` bookkeeping structure.

use indexmap::IndexMap;

use formula_engine::{Dataset, Value};

use crate::aggregator::RowVerdict;

/// Per-group tallies and the threshold verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    pub key: String,
    pub gc: usize,
    pub pc: usize,
    pub dnc: usize,
    pub total: usize,
    /// `(dnc + pc) / total * 100` — the union-of-nonconforming-categories
    /// semantics this report uses, rather than the narrower `dnc / total`
    /// alternative that would undercount groups carrying partial conformance.
    pub dnc_percentage: f64,
    /// `Dnc` when `dnc_percentage` exceeds the configured threshold,
    /// `Gc` otherwise. Reuses `RowVerdict`'s two conforming/non-conforming
    /// poles rather than introducing a parallel pass/fail type; `Pc` never
    /// occurs at group granularity.
    pub verdict: RowVerdict,
}

/// The full grouped report for one analytic run.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedReport {
    pub groups: Vec<GroupSummary>,
    /// The worst verdict across all groups; `Gc` by convention when there
    /// are no groups at all (empty dataset).
    pub overall_verdict: RowVerdict,
}

/// Groups `row_verdicts` by the value of `group_by` in `dataset`, then
/// judges each group against `threshold_percentage` (0..=100).
pub fn group_and_judge(
    dataset: &Dataset,
    group_by: &str,
    row_verdicts: &[RowVerdict],
    threshold_percentage: f64,
) -> GroupedReport {
    let mut groups: IndexMap<String, (usize, usize, usize)> = IndexMap::new();

    let group_values = dataset.column(group_by).map(|c| c.values.as_slice()).unwrap_or(&[]);

    for (row, verdict) in row_verdicts.iter().enumerate() {
        let key = group_values.get(row).map(group_key).unwrap_or_else(|| "".to_string());
        let entry = groups.entry(key).or_insert((0, 0, 0));
        match verdict {
            RowVerdict::Gc => entry.0 += 1,
            RowVerdict::Pc => entry.1 += 1,
            RowVerdict::Dnc => entry.2 += 1,
        }
    }

    let summaries: Vec<GroupSummary> = groups
        .into_iter()
        .map(|(key, (gc, pc, dnc))| {
            let total = gc + pc + dnc;
            let dnc_percentage = if total == 0 { 0.0 } else { (dnc + pc) as f64 / total as f64 * 100.0 };
            let verdict = if dnc_percentage > threshold_percentage { RowVerdict::Dnc } else { RowVerdict::Gc };
            GroupSummary { key, gc, pc, dnc, total, dnc_percentage, verdict }
        })
        .collect();

    let overall_verdict = summaries.iter().map(|g| g.verdict).max().unwrap_or(RowVerdict::Gc);

    GroupedReport { groups: summaries, overall_verdict }
}

/// Group keys are compared as text (the grouping column has no declared
/// type constraint); `Missing` groups rows under the empty string the same
/// way `Value::as_text` renders it elsewhere.
fn group_key(value: &Value) -> String {
    value.as_text()
}

#[cfg(test)]
mod tests {
    use super::*;
    use formula_engine::Column;

    fn verdicts(spec: &[(&str, usize, usize)]) -> (Dataset, Vec<RowVerdict>) {
        let mut groups = Vec::new();
        let mut verdicts = Vec::new();
        for (name, gc, dnc) in spec {
            for _ in 0..*gc {
                groups.push(Value::Text(name.to_string()));
                verdicts.push(RowVerdict::Gc);
            }
            for _ in 0..*dnc {
                groups.push(Value::Text(name.to_string()));
                verdicts.push(RowVerdict::Dnc);
            }
        }
        (Dataset::new(vec![Column::new("Group", groups)]), verdicts)
    }

    #[test]
    fn s5_grouping_and_threshold() {
        let (ds, row_verdicts) = verdicts(&[("A", 38, 2), ("B", 50, 10)]);
        let report = group_and_judge(&ds, "Group", &row_verdicts, 5.0);

        assert_eq!(report.groups.len(), 2);

        let a = &report.groups[0];
        assert_eq!(a.key, "A");
        assert_eq!(a.total, 40);
        assert!((a.dnc_percentage - 5.0).abs() < 1e-9);
        assert_eq!(a.verdict, RowVerdict::Gc);

        let b = &report.groups[1];
        assert_eq!(b.key, "B");
        assert_eq!(b.total, 60);
        assert!((b.dnc_percentage - 16.666_666_666_666_664).abs() < 1e-9);
        assert_eq!(b.verdict, RowVerdict::Dnc);

        assert_eq!(report.overall_verdict, RowVerdict::Dnc);
    }

    #[test]
    fn empty_dataset_is_gc_by_convention() {
        let ds = Dataset::new(vec![Column::new("Group", vec![])]);
        let report = group_and_judge(&ds, "Group", &[], 5.0);
        assert!(report.groups.is_empty());
        assert_eq!(report.overall_verdict, RowVerdict::Gc);
    }

    #[test]
    fn conservation_sum_of_group_totals_equals_row_count() {
        let (ds, row_verdicts) = verdicts(&[("A", 3, 1), ("B", 0, 4), ("C", 7, 0)]);
        let report = group_and_judge(&ds, "Group", &row_verdicts, 50.0);
        let sum_total: usize = report.groups.iter().map(|g| g.total).sum();
        assert_eq!(sum_total, row_verdicts.len());
        for g in &report.groups {
            assert_eq!(g.gc + g.pc + g.dnc, g.total);
        }
    }

    #[test]
    fn group_order_is_first_occurrence_insertion_order() {
        let ds = Dataset::new(vec![Column::new(
            "Group",
            vec![
                Value::Text("B".into()),
                Value::Text("A".into()),
                Value::Text("B".into()),
                Value::Text("C".into()),
            ],
        )]);
        let row_verdicts = vec![RowVerdict::Gc, RowVerdict::Gc, RowVerdict::Gc, RowVerdict::Gc];
        let report = group_and_judge(&ds, "Group", &row_verdicts, 100.0);
        let keys: Vec<&str> = report.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["B", "A", "C"]);
    }
}
