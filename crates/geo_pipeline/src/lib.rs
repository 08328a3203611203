//! geo_pipeline — deterministic pipeline surface
//! (prepare → collapse → resolve → aggregate → grid → validate → summary).
//!
//! This crate stays I/O-free: callers hand in already-parsed records and the
//! district master, and receive gridded tables plus a run summary. Every stage
//! is a pure function of its inputs plus the immutable master index.

use std::collections::BTreeMap;

use geo_algo::{MasterIndex, Normalizer, Resolver};
use geo_core::{
    CoreError, DistrictMasterEntry, KeyField, Keyed, MonthDomain, Params, RawRecord, RegionSource,
    Table,
};
use thiserror::Error;
use tracing::{info, warn};

pub mod aggregate;
pub mod grid;
pub mod prepare;
pub mod resolve;
pub mod summary;
pub mod validate;

pub use aggregate::{aggregate, AggregateError};
pub use grid::{complete_grid, GridError, RegionDomain};
pub use prepare::{prepare, Aliases, ExclusionCounts, Prepared};
pub use resolve::{resolve_rows, NearMiss, ResolveOutcome};
pub use summary::{InputDigest, RunSummary};
pub use validate::{validate_table, Severity, ValidationIssue, ValidationReport};

/// Key sets of the three output levels.
pub const DISTRICT_KEY: [KeyField; 3] = [KeyField::Month, KeyField::State, KeyField::District];
pub const STATE_KEY: [KeyField; 2] = [KeyField::Month, KeyField::State];
pub const NATIONAL_KEY: [KeyField; 1] = [KeyField::Month];

/// Single error surface for the pipeline orchestration.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid params: {0}")]
    Params(#[source] CoreError),

    #[error("district master has no usable entries")]
    EmptyMaster,

    #[error("aggregation failed at stage {stage}: {source}")]
    Aggregate { stage: &'static str, #[source] source: AggregateError },

    #[error("grid completion failed at stage {stage}: {source}")]
    Grid { stage: &'static str, #[source] source: GridError },

    /// Sum-preservation, key uniqueness or null-key violation. The run stops here.
    #[error("invariant violated at stage {stage}: {detail}")]
    Invariant { stage: &'static str, detail: String },
}

impl PipelineError {
    /// The invariant classes (as opposed to bad configuration or input data).
    /// A metric overflowing `u64` while summing is a property of the input.
    pub fn is_invariant(&self) -> bool {
        match self {
            PipelineError::Aggregate { source: AggregateError::Overflow { .. }, .. } => false,
            PipelineError::Invariant { .. }
            | PipelineError::Aggregate { .. }
            | PipelineError::Grid { .. } => true,
            PipelineError::Params(_) | PipelineError::EmptyMaster => false,
        }
    }
}

/// Everything a run consumes, already parsed.
#[derive(Clone, Debug, Default)]
pub struct RunInputs {
    pub master: Vec<DistrictMasterEntry>,
    pub raw: Vec<RawRecord>,
    /// Records the reader had to skip; echoed in the summary.
    pub skipped_malformed: usize,
    pub digests: Vec<InputDigest>,
}

/// Gridded tables at the three levels plus the summary.
#[derive(Clone, Debug)]
pub struct PipelineOutputs {
    pub district: Table,
    pub state: Table,
    pub national: Table,
    pub summary: RunSummary,
}

// -------------------------------------- Public API --------------------------------------

pub fn run(inputs: RunInputs, params: Params) -> Result<PipelineOutputs, PipelineError> {
    params.validate().map_err(PipelineError::Params)?;
    let cols = &params.metric_columns;

    let index = MasterIndex::build(&inputs.master);
    if index.is_empty() {
        return Err(PipelineError::EmptyMaster);
    }
    info!(districts = index.len(), states = index.state_count(), "master index built");

    // --- PREPARE ---
    let normalizer = Normalizer::new(&params.noise_words);
    let aliases = Aliases::new(&normalizer, &params.state_aliases, &params.district_aliases);
    let prepared = prepare(&inputs.raw, &normalizer, &aliases, params.month_domain.as_ref());
    if prepared.exclusions.total() > 0 {
        warn!(
            excluded = prepared.exclusions.total(),
            empty_state = prepared.exclusions.empty_state,
            empty_district = prepared.exclusions.empty_district,
            missing_month = prepared.exclusions.missing_month,
            outside_month_domain = prepared.exclusions.outside_month_domain,
            "rows excluded before resolution"
        );
    }
    info!(raw = inputs.raw.len(), prepared = prepared.rows.len(), "prepare done");

    let months = match &params.month_domain {
        Some(d) => d.clone(),
        None => MonthDomain::observed(prepared.months()),
    };
    let prepared_totals = totals("prepare", &prepared.rows, cols.len())?;

    // --- COLLAPSE (raw duplicates) ---
    let collapsed = aggregate(&prepared.rows, &prepare::PREPARED_KEY, cols)
        .map_err(|source| PipelineError::Aggregate { stage: "collapse", source })?;
    let mut reports = vec![checked(validate_table("collapse", &collapsed, &prepared_totals))?];
    let collapsed_len = collapsed.len();

    // --- RESOLVE ---
    let resolver = Resolver::new(&index, params.threshold);
    let resolved =
        resolve_rows(&prepared.rows, collapsed.rows, &resolver, cols.len(), params.low_confidence_sample)?;
    log_status(&resolved);
    reports.push(validate::resolution_notes(&resolved.by_rows));
    let matched_totals = resolved.matched_totals.clone();

    // --- DISTRICT ---
    let matched = resolved.matched();
    let district_agg = aggregate(&matched, &DISTRICT_KEY, cols)
        .map_err(|source| PipelineError::Aggregate { stage: "district", source })?;
    reports.push(checked(validate_table("district.aggregate", &district_agg, &matched_totals))?);
    let district_regions = match params.region_source {
        RegionSource::Master => RegionDomain::districts(index.canonical_pairs()),
        RegionSource::Observed => RegionDomain::observed(&district_agg),
    };
    let district = grid_level("district.grid", &district_agg, &months, &district_regions)?;
    reports.push(checked(validate_table("district.grid", &district, &matched_totals))?);

    // --- STATE ---
    let state_agg = aggregate(&district.rows, &STATE_KEY, cols)
        .map_err(|source| PipelineError::Aggregate { stage: "state", source })?;
    reports.push(checked(validate_table("state.aggregate", &state_agg, &matched_totals))?);
    let state_regions = match params.region_source {
        RegionSource::Master => RegionDomain::states(index.states()),
        RegionSource::Observed => RegionDomain::observed(&state_agg),
    };
    let state = grid_level("state.grid", &state_agg, &months, &state_regions)?;
    reports.push(checked(validate_table("state.grid", &state, &matched_totals))?);

    // --- NATIONAL ---
    let national_agg = aggregate(&state.rows, &NATIONAL_KEY, cols)
        .map_err(|source| PipelineError::Aggregate { stage: "national", source })?;
    reports.push(checked(validate_table("national.aggregate", &national_agg, &matched_totals))?);
    let national_regions = RegionDomain::national();
    let national = grid_level("national.grid", &national_agg, &months, &national_regions)?;
    reports.push(checked(validate_table("national.grid", &national, &matched_totals))?);

    info!(
        months = months.len(),
        district_rows = district.len(),
        state_rows = state.len(),
        national_rows = national.len(),
        "rollup complete"
    );

    // --- SUMMARY ---
    let summary = RunSummary {
        metric_columns: cols.clone(),
        threshold: params.threshold,
        region_source: params.region_source,
        month_domain_explicit: params.month_domain.is_some(),
        master: summary::MasterStats { districts: index.len(), states: index.state_count() },
        rows: summary::RowCounts {
            raw: inputs.raw.len(),
            skipped_malformed: inputs.skipped_malformed,
            prepared: prepared.rows.len(),
            collapsed: collapsed_len,
            distinct_pairs: resolved.by_pairs.total() as usize,
            unresolved: resolved.by_rows.unresolved(),
        },
        exclusions: prepared.exclusions,
        status_rows: resolved.by_rows,
        status_pairs: resolved.by_pairs,
        totals: cols
            .iter()
            .zip(prepared_totals.iter().zip(&matched_totals))
            .map(|(c, (p, m))| summary::MetricTotal { column: c.clone(), prepared: *p, matched: *m })
            .collect(),
        levels: vec![
            summary::LevelStats::of("district", &district, months.len(), district_regions.len()),
            summary::LevelStats::of("state", &state, months.len(), state_regions.len()),
            summary::LevelStats::of("national", &national, months.len(), national_regions.len()),
        ],
        validation: reports,
        near_misses: resolved.near_misses.clone(),
        inputs: inputs.digests,
        month_domain: months,
    };

    Ok(PipelineOutputs { district, state, national, summary })
}

// ------------------------------------ Helpers ------------------------------------

fn totals<R: Keyed>(stage: &'static str, records: &[R], width: usize) -> Result<Vec<u128>, PipelineError> {
    geo_core::keys::metric_totals(records, width)
        .map_err(|e| PipelineError::Invariant { stage, detail: e.to_string() })
}

/// Fatal issues stop the run with the first offending key.
fn checked(report: ValidationReport) -> Result<ValidationReport, PipelineError> {
    match report.first_error() {
        None => Ok(report),
        Some(issue) => Err(PipelineError::Invariant {
            stage: report.stage,
            detail: format!("{}: {} ({:?})", issue.code, issue.message, issue.where_),
        }),
    }
}

fn grid_level(
    stage: &'static str,
    table: &Table,
    months: &MonthDomain,
    regions: &RegionDomain,
) -> Result<Table, PipelineError> {
    complete_grid(table, months, regions).map_err(|source| PipelineError::Grid { stage, source })
}

fn log_status(resolved: &ResolveOutcome) {
    let by_rows: BTreeMap<&str, u64> =
        resolved.by_rows.iter().map(|(s, n)| (s.as_str(), n)).collect();
    info!(
        matched = resolved.by_rows.matched,
        low_confidence = resolved.by_rows.low_confidence,
        no_match = resolved.by_rows.no_match,
        state_not_found = resolved.by_rows.state_not_found,
        distinct_pairs = resolved.by_pairs.total(),
        "resolution done"
    );
    if resolved.by_rows.unresolved() > 0 {
        warn!(
            unresolved = resolved.by_rows.unresolved(),
            distribution = ?by_rows,
            "rows left out of district aggregation"
        );
    }
}
