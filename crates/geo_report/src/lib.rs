//! geo_report/src/lib.rs — Pure offline report model + renderers (JSON/text).
//!
//! Determinism rules:
//! - No I/O here. Callers hand in the run summary already in memory.
//! - Percent strings use one-decimal formatting from integer arithmetic.
//! - Stable section order and field names.
//!
//! The resolution section is always present, including on fully clean runs:
//! it is the operator's signal for data-quality drift between runs.

#![deny(unsafe_code)]

use geo_core::MatchStatus;
use geo_pipeline::validate::Severity;
use geo_pipeline::RunSummary;

#[cfg(feature = "render_json")]
pub mod render_json;
#[cfg(feature = "render_text")]
pub mod render_text;

#[cfg(feature = "render_json")]
pub use render_json::render_json;
#[cfg(feature = "render_text")]
pub use render_text::render_text;

// ===== Model =====
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportModel {
    pub overview: SectionOverview,
    pub resolution: SectionResolution,
    pub exclusions: SectionExclusions,
    pub totals: SectionTotals,
    pub validation: SectionValidation,
    pub near_misses: SectionNearMisses,
    pub integrity: SectionIntegrity,
}

// --- Sections ---
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionOverview {
    pub title: String,
    pub metric_columns: Vec<String>,
    pub threshold: String,
    pub region_source: String,
    pub months: Vec<String>,
    /// "configured" or "observed".
    pub month_domain_source: String,
    pub master_districts: usize,
    pub master_states: usize,
    pub levels: Vec<LevelRow>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelRow {
    pub level: String,
    pub months: usize,
    pub regions: usize,
    pub rows: usize,
    pub zero_rows: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusRow {
    pub status: String,
    pub rows: u64,
    pub rows_pct_1dp: String,
    pub pairs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionResolution {
    /// One row per status, in fixed status order, zeros included.
    pub statuses: Vec<StatusRow>,
    pub total_rows: u64,
    pub total_pairs: u64,
    pub unresolved_rows: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionExclusions {
    pub raw_rows: usize,
    pub skipped_malformed: usize,
    pub empty_state: u64,
    pub empty_district: u64,
    pub missing_month: u64,
    pub outside_month_domain: u64,
    pub total_excluded: u64,
    pub prepared_rows: usize,
    pub collapsed_rows: usize,
}

/// Totals are pre-rendered strings so wide sums never pass through floats.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TotalRow {
    pub column: String,
    pub prepared: String,
    pub matched: String,
    pub unresolved: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionTotals {
    pub rows: Vec<TotalRow>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageRow {
    pub stage: String,
    pub pass: bool,
    pub errors: usize,
    pub warnings: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssueRow {
    pub stage: String,
    pub severity: String,
    pub code: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionValidation {
    pub pass: bool,
    pub stages: Vec<StageRow>,
    pub issues: Vec<IssueRow>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NearMissRow {
    pub state: String,
    pub district_norm: String,
    pub candidate: Option<String>,
    pub score_1dp: String,
    pub rows: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionNearMisses {
    pub rows: Vec<NearMissRow>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputRow {
    pub role: String,
    pub path: String,
    pub sha256: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionIntegrity {
    pub engine_version: String,
    pub inputs: Vec<InputRow>,
}

// ===== API =====

/// Build the report model from a run summary (pure, offline).
pub fn build_model(summary: &RunSummary) -> ReportModel {
    // ---- Overview ----
    let overview = SectionOverview {
        title: "District monthly rollup".to_string(),
        metric_columns: summary.metric_columns.clone(),
        threshold: format!("{:.1}", summary.threshold),
        region_source: summary.region_source.as_str().to_string(),
        months: summary.month_domain.months().iter().map(|m| m.label()).collect(),
        month_domain_source: if summary.month_domain_explicit { "configured" } else { "observed" }
            .to_string(),
        master_districts: summary.master.districts,
        master_states: summary.master.states,
        levels: summary
            .levels
            .iter()
            .map(|l| LevelRow {
                level: l.level.to_string(),
                months: l.months,
                regions: l.regions,
                rows: l.rows,
                zero_rows: l.zero_rows,
            })
            .collect(),
    };

    // ---- Resolution (always present) ----
    let total_rows = summary.status_rows.total();
    let resolution = SectionResolution {
        statuses: MatchStatus::ALL
            .iter()
            .map(|&s| {
                let rows = summary.status_rows.get(s);
                StatusRow {
                    status: s.as_str().to_string(),
                    rows,
                    rows_pct_1dp: percent_one_decimal(rows, total_rows),
                    pairs: summary.status_pairs.get(s),
                }
            })
            .collect(),
        total_rows,
        total_pairs: summary.status_pairs.total(),
        unresolved_rows: summary.status_rows.unresolved(),
    };

    // ---- Exclusions ----
    let ex = &summary.exclusions;
    let exclusions = SectionExclusions {
        raw_rows: summary.rows.raw,
        skipped_malformed: summary.rows.skipped_malformed,
        empty_state: ex.empty_state,
        empty_district: ex.empty_district,
        missing_month: ex.missing_month,
        outside_month_domain: ex.outside_month_domain,
        total_excluded: ex.total(),
        prepared_rows: summary.rows.prepared,
        collapsed_rows: summary.rows.collapsed,
    };

    // ---- Totals ----
    let totals = SectionTotals {
        rows: summary
            .totals
            .iter()
            .map(|t| TotalRow {
                column: t.column.clone(),
                prepared: t.prepared.to_string(),
                matched: t.matched.to_string(),
                unresolved: t.prepared.saturating_sub(t.matched).to_string(),
            })
            .collect(),
    };

    // ---- Validation ----
    let count = |issues: &[geo_pipeline::ValidationIssue], sev: Severity| {
        issues.iter().filter(|i| i.severity == sev).count()
    };
    let validation = SectionValidation {
        pass: summary.validation.iter().all(|r| r.pass),
        stages: summary
            .validation
            .iter()
            .map(|r| StageRow {
                stage: r.stage.to_string(),
                pass: r.pass,
                errors: count(&r.issues, Severity::Error),
                warnings: count(&r.issues, Severity::Warning),
            })
            .collect(),
        issues: summary
            .validation
            .iter()
            .flat_map(|r| {
                r.issues.iter().map(move |i| IssueRow {
                    stage: r.stage.to_string(),
                    severity: severity_token(i.severity).to_string(),
                    code: i.code.to_string(),
                    message: i.message.clone(),
                })
            })
            .collect(),
    };

    // ---- Near-misses ----
    let near_misses = SectionNearMisses {
        rows: summary
            .near_misses
            .iter()
            .map(|n| NearMissRow {
                state: n.state.clone(),
                district_norm: n.district_norm.clone(),
                candidate: n.candidate.clone(),
                score_1dp: format!("{:.1}", n.score),
                rows: n.rows,
            })
            .collect(),
    };

    // ---- Integrity ----
    let integrity = SectionIntegrity {
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        inputs: summary
            .inputs
            .iter()
            .map(|d| InputRow { role: d.role.clone(), path: d.path.clone(), sha256: d.sha256.clone() })
            .collect(),
    };

    ReportModel { overview, resolution, exclusions, totals, validation, near_misses, integrity }
}

// ===== Helpers (pure; no floats) =====

fn severity_token(s: Severity) -> &'static str {
    match s {
        Severity::Error => "error",
        Severity::Warning => "warning",
    }
}

/// `num / den` as a percent with one decimal, rounded half-up in integer space.
/// A zero denominator renders as `0.0%`.
pub fn percent_one_decimal(num: u64, den: u64) -> String {
    if den == 0 {
        return "0.0%".to_string();
    }
    let (n, d) = (u128::from(num), u128::from(den));
    let tenths = (n * 1000 + d / 2) / d;
    format!("{}.{}%", tenths / 10, tenths % 10)
}
