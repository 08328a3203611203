//! End-to-end scenarios for the rollup pipeline: spelling-variant merging,
//! sum preservation across every level, grid completeness, month ordering,
//! the always-present status distribution, and runs where nothing survives.

use geo_core::{
    DistrictMasterEntry, KeyField, KeyValue, MatchStatus, MonthDomain, Params, RawRecord,
    RegionSource, Table,
};
use geo_pipeline::{run, PipelineError, RunInputs, Severity};
use proptest::prelude::*;

// -----------------------------------------------------------------------------
// Fixture builders
// -----------------------------------------------------------------------------

fn master(rows: &[(&str, &str)]) -> Vec<DistrictMasterEntry> {
    rows.iter()
        .enumerate()
        .map(|(i, (s, d))| DistrictMasterEntry {
            state_norm: s.to_string(),
            district_standard: d.to_string(),
            district_lgd_code: (500 + i).to_string(),
        })
        .collect()
}

fn raw(state: &str, district: &str, month: &str, metric: u64) -> RawRecord {
    RawRecord {
        state_raw: Some(state.to_string()),
        district_raw: Some(district.to_string()),
        month: Some(month.parse().unwrap()),
        metrics: vec![metric],
        ..RawRecord::default()
    }
}

fn one_metric() -> Params {
    Params { metric_columns: vec!["metric".into()], ..Params::default() }
}

fn cell(table: &Table, month: &str, region: &[KeyValue]) -> Option<Vec<u64>> {
    let month: geo_core::Month = month.parse().unwrap();
    table
        .rows
        .iter()
        .find(|r| {
            r.key.get(KeyField::Month) == Some(&KeyValue::Month(month))
                && region.iter().all(|v| r.key.values().contains(v))
        })
        .map(|r| r.metrics.clone())
}

// -----------------------------------------------------------------------------
// Scenarios
// -----------------------------------------------------------------------------

#[test]
fn spelling_variants_merge_into_one_district_row() {
    let inputs = RunInputs {
        master: master(&[("andhra pradesh", "anantapur")]),
        raw: vec![
            raw("Andhra pradesh", "Ananthapur", "March 2025", 10),
            raw("andhra pradesh", "anantapur", "March 2025", 5),
        ],
        ..RunInputs::default()
    };
    let out = run(inputs, one_metric()).unwrap();

    assert_eq!(out.district.len(), 1);
    let row = &out.district.rows[0];
    assert_eq!(
        row.key.values(),
        &[
            KeyValue::Month("March 2025".parse().unwrap()),
            KeyValue::State("andhra pradesh".into()),
            KeyValue::District("anantapur".into()),
        ]
    );
    assert_eq!(row.metrics, vec![15]);
    assert_eq!(out.summary.status_rows.matched, 2);
    assert_eq!(out.summary.status_pairs.matched, 2);
    assert_eq!(out.state.rows[0].metrics, vec![15]);
    assert_eq!(out.national.rows[0].metrics, vec![15]);
}

#[test]
fn unresolved_rows_are_counted_and_kept_out_of_totals() {
    let inputs = RunInputs {
        master: master(&[("goa", "north goa"), ("goa", "south goa"), ("kerala", "idukki")]),
        raw: vec![
            raw("Goa", "North Goa", "March 2025", 3),
            raw("Goa", "Panaji", "March 2025", 100),
            raw("Atlantis", "Idukki", "March 2025", 50),
            raw("", "Idukki", "March 2025", 7),
        ],
        ..RunInputs::default()
    };
    let out = run(inputs, one_metric()).unwrap();
    let s = &out.summary;

    assert_eq!(s.exclusions.empty_state, 1);
    assert_eq!(s.status_rows.matched, 1);
    assert_eq!(s.status_rows.low_confidence, 1);
    assert_eq!(s.status_rows.state_not_found, 1);
    assert_eq!(s.rows.unresolved, 2);
    assert_eq!(s.totals[0].prepared, 153);
    assert_eq!(s.totals[0].matched, 3);
    assert_eq!(out.national.rows[0].metrics, vec![3]);
    assert_eq!(s.near_misses.len(), 1);
    assert_eq!(s.near_misses[0].district_norm, "panaji");

    // The status distribution surfaces as informational, never fatal.
    let notes = s.validation.iter().find(|r| r.stage == "resolve").unwrap();
    assert!(notes.pass);
    assert!(notes.issues.iter().all(|i| i.severity == Severity::Warning));
    assert!(s.validation.iter().all(|r| r.pass));
}

#[test]
fn master_regions_keep_inactive_districts_as_zero_rows() {
    let inputs = RunInputs {
        master: master(&[("goa", "north goa"), ("goa", "south goa"), ("kerala", "idukki")]),
        raw: vec![
            raw("Goa", "North Goa", "March 2025", 3),
            raw("Goa", "North Goa", "April 2025", 4),
        ],
        ..RunInputs::default()
    };
    let out = run(inputs, one_metric()).unwrap();

    // 2 months × 3 canonical districts.
    assert_eq!(out.district.len(), 6);
    assert_eq!(
        cell(&out.district, "April 2025", &[KeyValue::District("idukki".into())]),
        Some(vec![0])
    );
    // 2 months × 2 master states.
    assert_eq!(out.state.len(), 4);
    assert_eq!(
        cell(&out.state, "March 2025", &[KeyValue::State("kerala".into())]),
        Some(vec![0])
    );
    assert_eq!(out.national.len(), 2);
    assert_eq!(out.summary.levels[0].zero_rows, 4);
}

#[test]
fn observed_regions_only_grid_what_matched() {
    let inputs = RunInputs {
        master: master(&[("goa", "north goa"), ("goa", "south goa"), ("kerala", "idukki")]),
        raw: vec![
            raw("Goa", "North Goa", "March 2025", 3),
            raw("Kerala", "Idukki", "April 2025", 4),
        ],
        ..RunInputs::default()
    };
    let params = Params { region_source: RegionSource::Observed, ..one_metric() };
    let out = run(inputs, params).unwrap();
    assert_eq!(out.district.len(), 4);
    assert_eq!(
        cell(&out.district, "April 2025", &[KeyValue::District("north goa".into())]),
        Some(vec![0])
    );
    assert_eq!(out.state.len(), 4);
}

#[test]
fn configured_month_order_wins_over_alphabetical() {
    let inputs = RunInputs {
        master: master(&[("goa", "north goa")]),
        raw: vec![
            raw("Goa", "North Goa", "April 2025", 1),
            raw("Goa", "North Goa", "March 2025", 2),
        ],
        ..RunInputs::default()
    };
    let params = Params {
        month_domain: Some(MonthDomain::from_labels(&["March 2025", "April 2025", "May 2025"]).unwrap()),
        ..one_metric()
    };
    let out = run(inputs, params).unwrap();
    let labels: Vec<String> = out
        .national
        .rows
        .iter()
        .map(|r| r.key.values()[0].render())
        .collect();
    assert_eq!(labels, vec!["March 2025", "April 2025", "May 2025"]);
    assert_eq!(out.national.rows[2].metrics, vec![0]);
    assert!(out.summary.month_domain_explicit);
}

#[test]
fn rows_outside_configured_months_are_excluded_and_counted() {
    let inputs = RunInputs {
        master: master(&[("goa", "north goa")]),
        raw: vec![
            raw("Goa", "North Goa", "March 2025", 1),
            raw("Goa", "North Goa", "December 2024", 9),
        ],
        ..RunInputs::default()
    };
    let params = Params {
        month_domain: Some(MonthDomain::from_labels(&["March 2025"]).unwrap()),
        ..one_metric()
    };
    let out = run(inputs, params).unwrap();
    assert_eq!(out.summary.exclusions.outside_month_domain, 1);
    assert_eq!(out.national.rows[0].metrics, vec![1]);
}

#[test]
fn cross_state_names_never_match() {
    let inputs = RunInputs {
        master: master(&[("maharashtra", "aurangabad"), ("bihar", "aurangabad")]),
        raw: vec![
            raw("Bihar", "Aurangabad", "March 2025", 1),
            raw("Maharashtra", "Aurangabad", "March 2025", 2),
        ],
        ..RunInputs::default()
    };
    let out = run(inputs, one_metric()).unwrap();
    assert_eq!(
        cell(&out.state, "March 2025", &[KeyValue::State("bihar".into())]),
        Some(vec![1])
    );
    assert_eq!(
        cell(&out.state, "March 2025", &[KeyValue::State("maharashtra".into())]),
        Some(vec![2])
    );
}

#[test]
fn empty_master_and_bad_params_are_rejected() {
    let err = run(RunInputs::default(), one_metric()).unwrap_err();
    assert!(matches!(err, PipelineError::EmptyMaster));
    assert!(!err.is_invariant());

    let inputs = RunInputs { master: master(&[("goa", "north goa")]), ..RunInputs::default() };
    let err = run(inputs, Params { threshold: 120.0, ..one_metric() }).unwrap_err();
    assert!(matches!(err, PipelineError::Params(_)));
}

#[test]
fn metric_width_mismatch_is_an_invariant_failure() {
    let mut bad = raw("Goa", "North Goa", "March 2025", 1);
    bad.metrics.push(2);
    let inputs = RunInputs { master: master(&[("goa", "north goa")]), raw: vec![bad], ..RunInputs::default() };
    let err = run(inputs, one_metric()).unwrap_err();
    assert!(err.is_invariant());
}

#[test]
fn metric_overflow_is_a_data_error() {
    let inputs = RunInputs {
        master: master(&[("goa", "north goa")]),
        raw: vec![
            raw("Goa", "North Goa", "March 2025", u64::MAX),
            raw("Goa", "North Goa", "March 2025", 1),
        ],
        ..RunInputs::default()
    };
    let err = run(inputs, one_metric()).unwrap_err();
    assert!(matches!(err, PipelineError::Aggregate { .. }));
    assert!(!err.is_invariant());
}

#[test]
fn all_rows_excluded_gives_empty_tables_and_zero_totals() {
    let mut rows = vec![raw("123", "North Goa", "March 2025", 5), raw("Goa", "--", "March 2025", 2)];
    for r in &mut rows {
        r.metrics = vec![1, 2, 3];
    }
    let inputs = RunInputs { master: master(&[("goa", "north goa")]), raw: rows, ..RunInputs::default() };
    let params = Params { metric_columns: vec!["a".into(), "b".into(), "c".into()], ..Params::default() };
    let out = run(inputs, params).unwrap();
    let s = &out.summary;

    assert_eq!(s.exclusions.empty_state, 1);
    assert_eq!(s.exclusions.empty_district, 1);
    assert_eq!(s.rows.prepared, 0);
    assert_eq!(s.status_rows.total(), 0);
    assert_eq!(s.totals.len(), 3);
    assert!(s.totals.iter().all(|t| t.prepared == 0 && t.matched == 0));
    // No observed months: every level is an empty grid.
    assert!(out.district.rows.is_empty() && out.state.rows.is_empty() && out.national.rows.is_empty());
    assert_eq!(out.district.metric_columns.len(), 3);
    assert!(s.validation.iter().all(|r| r.pass));
}

#[test]
fn explicit_months_still_grid_zeros_without_input() {
    let inputs = RunInputs { master: master(&[("goa", "north goa")]), ..RunInputs::default() };
    let params = Params {
        month_domain: Some(MonthDomain::from_labels(&["March 2025", "April 2025"]).unwrap()),
        ..one_metric()
    };
    let out = run(inputs, params).unwrap();
    assert_eq!(out.district.len(), 2);
    assert!(out.national.rows.iter().all(|r| r.metrics == vec![0]));
}

#[test]
fn district_aliases_merge_before_fuzzy_matching() {
    let inputs = RunInputs {
        master: master(&[("andhra pradesh", "anantapur"), ("andhra pradesh", "karimnagar")]),
        raw: vec![
            raw("Andhra Pradesh", "Ananthapuramu", "March 2025", 4),
            raw("Andhra Pradesh", "Anantapur", "March 2025", 6),
            raw("Andhra Pradesh", "Ananthapur Dist.", "March 2025", 1),
        ],
        ..RunInputs::default()
    };
    let mut params = one_metric();
    params.district_aliases = [(
        "andhra pradesh".to_string(),
        [("ananthapuramu".to_string(), "anantapur".to_string())].into_iter().collect(),
    )]
    .into_iter()
    .collect();
    let out = run(inputs, params).unwrap();

    assert_eq!(out.summary.status_rows.matched, 3);
    assert_eq!(
        cell(&out.district, "March 2025", &[KeyValue::District("anantapur".into())]),
        Some(vec![11])
    );
}

#[test]
fn summary_serializes_with_status_distribution() {
    let inputs = RunInputs {
        master: master(&[("goa", "north goa")]),
        raw: vec![raw("Goa", "North Goa", "March 2025", 1)],
        ..RunInputs::default()
    };
    let out = run(inputs, one_metric()).unwrap();
    let v = serde_json::to_value(&out.summary).unwrap();
    assert_eq!(v["status_rows"]["matched"], 1);
    assert_eq!(v["status_rows"]["state_not_found"], 0);
    assert_eq!(v["month_domain"][0], "March 2025");
    assert_eq!(v["region_source"], "master");
    assert_eq!(MatchStatus::ALL.len(), 4);
}

// -----------------------------------------------------------------------------
// Properties
// -----------------------------------------------------------------------------

const STATES: [&str; 3] = ["goa", "kerala", "bihar"];
const DISTRICTS: [&str; 3] = ["north goa", "idukki", "gaya"];
const MONTHS: [&str; 3] = ["March 2025", "April 2025", "May 2025"];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_level_sums_to_the_matched_input(
        rows in proptest::collection::vec((0usize..3, 0usize..3, 0usize..3, 0u64..10_000), 1..40)
    ) {
        let inputs = RunInputs {
            master: master(&[("goa", "north goa"), ("kerala", "idukki"), ("bihar", "gaya")]),
            raw: rows
                .iter()
                .map(|&(s, d, m, v)| raw(STATES[s], DISTRICTS[d], MONTHS[m], v))
                .collect(),
            ..RunInputs::default()
        };
        let expected: u128 = rows
            .iter()
            .filter(|&&(s, d, _, _)| s == d)
            .map(|&(_, _, _, v)| u128::from(v))
            .sum();

        let out = run(inputs, one_metric()).unwrap();
        prop_assert_eq!(out.summary.totals[0].matched, expected);
        prop_assert_eq!(out.district.metric_totals().unwrap(), vec![expected]);
        prop_assert_eq!(out.state.metric_totals().unwrap(), vec![expected]);
        prop_assert_eq!(out.national.metric_totals().unwrap(), vec![expected]);

        let m = out.summary.month_domain.len();
        prop_assert_eq!(out.district.len(), m * 3);
        prop_assert_eq!(out.state.len(), m * 3);
        prop_assert_eq!(out.national.len(), m);
    }
}
