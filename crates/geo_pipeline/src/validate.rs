//! crates/geo_pipeline/src/validate.rs
//! Post-stage validation: exact sum preservation, key uniqueness, no null keys.
//! Deterministic outputs; pure integer reasoning.
//!
//! Errors are fatal for the run; warnings are informational (match-status
//! distribution) and never block completion.

use std::collections::BTreeSet;

use geo_core::{MatchStatus, StatusCounts, Table};
use serde::Serialize;

/// Issue severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// Where the issue occurred (kept small & deterministic).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "at", rename_all = "snake_case")]
pub enum EntityRef {
    Root,
    Metric(String),
    Key(String),
    Status(MatchStatus),
}

/// One validation finding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    #[serde(rename = "where")]
    pub where_: EntityRef,
}

/// Deterministic report: pass = (no Error); ordering of issues is stable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub stage: &'static str,
    pub pass: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn from_issues(stage: &'static str, mut issues: Vec<ValidationIssue>) -> Self {
        sort_issues_stably(&mut issues);
        Self { stage, pass: !issues.iter().any(|i| i.severity == Severity::Error), issues }
    }

    pub fn first_error(&self) -> Option<&ValidationIssue> {
        self.issues.iter().find(|i| i.severity == Severity::Error)
    }
}

/// Validate one stage's output table against the exact totals of its input.
pub fn validate_table(stage: &'static str, table: &Table, expected_totals: &[u128]) -> ValidationReport {
    let mut issues = Vec::new();
    issues.extend(check_shape(table));
    issues.extend(check_sum_preservation(table, expected_totals));
    issues.extend(check_key_uniqueness(table));
    issues.extend(check_null_keys(table));
    ValidationReport::from_issues(stage, issues)
}

/// Informational: status distribution. Never fails.
pub fn resolution_notes(by_rows: &StatusCounts) -> ValidationReport {
    let total = by_rows.total();
    let issues = by_rows
        .iter()
        .filter(|(s, n)| *s != MatchStatus::Matched && *n > 0)
        .map(|(s, n)| ValidationIssue {
            severity: Severity::Warning,
            code: "Resolution.Unmatched",
            message: format!("{n} of {total} rows resolved as {s}"),
            where_: EntityRef::Status(s),
        })
        .collect();
    ValidationReport::from_issues("resolve", issues)
}

// ------------------------------------------------------------------------------------------------
// Checks
// ------------------------------------------------------------------------------------------------

/// Every row carries exactly the table's key fields and metric width.
fn check_shape(table: &Table) -> Vec<ValidationIssue> {
    let width = table.metric_columns.len();
    let mut issues = Vec::new();
    for row in &table.rows {
        if row.key.fields() != table.key_fields {
            issues.push(ValidationIssue {
                severity: Severity::Error,
                code: "Key.Shape",
                message: "row key fields differ from table key fields".to_string(),
                where_: EntityRef::Key(row.key.describe()),
            });
        }
        if row.metrics.len() != width {
            issues.push(ValidationIssue {
                severity: Severity::Error,
                code: "Metric.Width",
                message: format!("{} metrics, expected {width}", row.metrics.len()),
                where_: EntityRef::Key(row.key.describe()),
            });
        }
    }
    issues
}

/// Exact per-column equality; no tolerance.
fn check_sum_preservation(table: &Table, expected: &[u128]) -> Vec<ValidationIssue> {
    let mut actual = vec![0u128; table.metric_columns.len()];
    let mut overflow = false;
    for row in &table.rows {
        for (acc, v) in actual.iter_mut().zip(&row.metrics) {
            match acc.checked_add(u128::from(*v)) {
                Some(s) => *acc = s,
                None => overflow = true,
            }
        }
    }
    if overflow {
        return vec![ValidationIssue {
            severity: Severity::Error,
            code: "Sum.Overflow",
            message: "metric total overflowed".to_string(),
            where_: EntityRef::Root,
        }];
    }
    if expected.len() != actual.len() {
        return vec![ValidationIssue {
            severity: Severity::Error,
            code: "Sum.Width",
            message: format!("{} expected totals for {} metric columns", expected.len(), actual.len()),
            where_: EntityRef::Root,
        }];
    }
    table
        .metric_columns
        .iter()
        .zip(actual.iter().zip(expected))
        .filter(|(_, (a, e))| a != e)
        .map(|(col, (a, e))| ValidationIssue {
            severity: Severity::Error,
            code: "Sum.Mismatch",
            message: format!("sum {a} != input sum {e}"),
            where_: EntityRef::Metric(col.clone()),
        })
        .collect()
}

fn check_key_uniqueness(table: &Table) -> Vec<ValidationIssue> {
    let mut seen = BTreeSet::new();
    let mut reported = BTreeSet::new();
    let mut issues = Vec::new();
    for row in &table.rows {
        if !seen.insert(&row.key) && reported.insert(&row.key) {
            issues.push(ValidationIssue {
                severity: Severity::Error,
                code: "Key.Duplicate",
                message: "grouping key occurs more than once".to_string(),
                where_: EntityRef::Key(row.key.describe()),
            });
        }
    }
    issues
}

/// Geographic and time keys must be present and non-empty; optional
/// dedup helpers (date, pincode) may be absent.
fn check_null_keys(table: &Table) -> Vec<ValidationIssue> {
    table
        .rows
        .iter()
        .flat_map(|row| {
            row.key
                .values()
                .iter()
                .filter(|v| v.field().is_required() && v.is_null())
                .map(move |v| ValidationIssue {
                    severity: Severity::Error,
                    code: "Key.Null",
                    message: format!("{} is empty", v.field().column()),
                    where_: EntityRef::Key(row.key.describe()),
                })
        })
        .collect()
}

fn sort_issues_stably(issues: &mut [ValidationIssue]) {
    use core::cmp::Ordering;
    issues.sort_by(|a, b| match a.code.cmp(b.code) {
        Ordering::Equal => match cmp_where(&a.where_, &b.where_) {
            Ordering::Equal => a.message.cmp(&b.message),
            o => o,
        },
        o => o,
    });
}

fn cmp_where(a: &EntityRef, b: &EntityRef) -> core::cmp::Ordering {
    use EntityRef::*;
    fn rank(e: &EntityRef) -> u8 {
        match e {
            Root => 0,
            Metric(_) => 1,
            Key(_) => 2,
            Status(_) => 3,
        }
    }
    match (a, b) {
        (Metric(x), Metric(y)) | (Key(x), Key(y)) => x.cmp(y),
        (Status(x), Status(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_core::{GroupKey, KeyField, KeyValue, Row};

    fn row(state: &str, v: u64) -> Row {
        Row {
            key: GroupKey::new(vec![
                KeyValue::Month("March 2025".parse().unwrap()),
                KeyValue::State(state.into()),
            ]),
            metrics: vec![v],
        }
    }

    fn table(rows: Vec<Row>) -> Table {
        Table { key_fields: vec![KeyField::Month, KeyField::State], metric_columns: vec!["m".into()], rows }
    }

    #[test]
    fn clean_table_passes() {
        let r = validate_table("state", &table(vec![row("goa", 1), row("kerala", 2)]), &[3]);
        assert!(r.pass);
        assert!(r.issues.is_empty());
    }

    #[test]
    fn sum_mismatch_is_fatal() {
        let r = validate_table("state", &table(vec![row("goa", 1)]), &[2]);
        assert!(!r.pass);
        let e = r.first_error().unwrap();
        assert_eq!(e.code, "Sum.Mismatch");
        assert_eq!(e.where_, EntityRef::Metric("m".into()));
    }

    #[test]
    fn duplicates_and_nulls_are_fatal() {
        let r = validate_table("state", &table(vec![row("goa", 1), row("goa", 1), row(" ", 0)]), &[2]);
        assert!(!r.pass);
        let codes: Vec<&str> = r.issues.iter().map(|i| i.code).collect();
        assert_eq!(codes, vec!["Key.Duplicate", "Key.Null"]);
    }

    #[test]
    fn status_distribution_is_informational() {
        let mut c = StatusCounts::default();
        c.add(MatchStatus::Matched, 5);
        c.add(MatchStatus::StateNotFound, 2);
        c.add(MatchStatus::LowConfidence, 1);
        let r = resolution_notes(&c);
        assert!(r.pass);
        assert_eq!(r.issues.len(), 2);
        assert!(r.issues.iter().all(|i| i.severity == Severity::Warning));
        assert_eq!(r.issues[0].where_, EntityRef::Status(MatchStatus::LowConfidence));
    }
}
