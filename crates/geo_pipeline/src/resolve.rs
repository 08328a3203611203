//! RESOLVE stage: resolve each distinct `(state, district_norm)` pair once and
//! join the resolutions back onto the collapsed rows.

use std::collections::BTreeMap;

use geo_algo::Resolver;
use geo_core::{
    KeyField, KeyValue, MatchStatus, NormalizedKey, Resolution, ResolvedRecord, Row, StatusCounts,
};
use serde::Serialize;
use tracing::debug;

use crate::PipelineError;

/// A low-confidence pair kept for manual review.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NearMiss {
    pub state: String,
    pub district_norm: String,
    pub candidate: Option<String>,
    pub score: f64,
    /// Prepared rows carrying this pair.
    pub rows: u64,
}

#[derive(Clone, Debug, Default)]
pub struct ResolveOutcome {
    /// Collapsed rows with their resolution, in collapsed order.
    pub records: Vec<ResolvedRecord>,
    /// Status distribution over prepared rows.
    pub by_rows: StatusCounts,
    /// Status distribution over distinct pairs.
    pub by_pairs: StatusCounts,
    /// Exact per-metric totals of prepared rows that resolved to `matched`.
    pub matched_totals: Vec<u128>,
    pub near_misses: Vec<NearMiss>,
}

impl ResolveOutcome {
    pub fn matched(&self) -> Vec<&ResolvedRecord> {
        self.records.iter().filter(|r| r.resolution.is_matched()).collect()
    }
}

fn pair_of(row: &Row) -> Option<NormalizedKey> {
    match (row.key.get(KeyField::State), row.key.get(KeyField::DistrictNorm)) {
        (Some(KeyValue::State(s)), Some(KeyValue::DistrictNorm(d))) => {
            Some(NormalizedKey::new(s.clone(), d.clone()))
        }
        _ => None,
    }
}

fn missing_pair(stage: &'static str, row: &Row) -> PipelineError {
    PipelineError::Invariant {
        stage,
        detail: format!("row ({}) carries no state/district pair", row.key.describe()),
    }
}

/// `prepared` supplies the row-level status counts and matched totals;
/// `collapsed` rows are the ones joined and returned. `width` is the configured
/// metric column count, so an empty input still yields zeroed totals.
pub fn resolve_rows(
    prepared: &[Row],
    collapsed: Vec<Row>,
    resolver: &Resolver<'_>,
    width: usize,
    near_miss_sample: usize,
) -> Result<ResolveOutcome, PipelineError> {

    // Rows per distinct pair.
    let mut pair_rows: BTreeMap<NormalizedKey, u64> = BTreeMap::new();
    for row in prepared {
        let pair = pair_of(row).ok_or_else(|| missing_pair("resolve", row))?;
        *pair_rows.entry(pair).or_default() += 1;
    }

    let resolutions: BTreeMap<NormalizedKey, Resolution> = resolver.resolve_distinct(pair_rows.keys());

    let mut out = ResolveOutcome { matched_totals: vec![0; width], ..ResolveOutcome::default() };
    for (pair, res) in &resolutions {
        let n = pair_rows.get(pair).copied().unwrap_or(0);
        out.by_pairs.add(res.status, 1);
        out.by_rows.add(res.status, n);
        debug!(
            state = %pair.state,
            district = %pair.district,
            status = %res.status,
            score = res.score,
            candidate = res.district.as_deref().unwrap_or(""),
            "pair resolved"
        );
    }

    for row in prepared {
        let pair = pair_of(row).ok_or_else(|| missing_pair("resolve", row))?;
        if resolutions.get(&pair).is_some_and(Resolution::is_matched) {
            for (acc, v) in out.matched_totals.iter_mut().zip(&row.metrics) {
                *acc = acc.checked_add(u128::from(*v)).ok_or_else(|| PipelineError::Invariant {
                    stage: "resolve",
                    detail: "matched total overflowed".to_string(),
                })?;
            }
        }
    }

    out.records.reserve(collapsed.len());
    for row in collapsed {
        let pair = pair_of(&row).ok_or_else(|| missing_pair("resolve", &row))?;
        let resolution = resolutions.get(&pair).cloned().ok_or_else(|| PipelineError::Invariant {
            stage: "resolve",
            detail: format!("pair ({}, {}) was never resolved", pair.state, pair.district),
        })?;
        out.records.push(ResolvedRecord { row, resolution });
    }

    out.near_misses = sample_near_misses(&resolutions, &pair_rows, near_miss_sample);
    Ok(out)
}

/// Highest-scoring low-confidence pairs first; ties by pair.
fn sample_near_misses(
    resolutions: &BTreeMap<NormalizedKey, Resolution>,
    pair_rows: &BTreeMap<NormalizedKey, u64>,
    n: usize,
) -> Vec<NearMiss> {
    let mut misses: Vec<NearMiss> = resolutions
        .iter()
        .filter(|(_, r)| r.status == MatchStatus::LowConfidence)
        .map(|(k, r)| NearMiss {
            state: k.state.clone(),
            district_norm: k.district.clone(),
            candidate: r.district.clone(),
            score: r.score,
            rows: pair_rows.get(k).copied().unwrap_or(0),
        })
        .collect();
    // BTreeMap order already breaks ties; the sort is stable.
    misses.sort_by(|a, b| b.score.total_cmp(&a.score));
    misses.truncate(n);
    misses
}
