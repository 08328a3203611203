//! Run summary: everything an operator needs to judge a run, including the
//! status distribution, which is always present even on fully clean runs.

use geo_core::{MonthDomain, RegionSource, StatusCounts, Table};
use serde::{Deserialize, Serialize};

use crate::prepare::ExclusionCounts;
use crate::resolve::NearMiss;
use crate::validate::ValidationReport;

/// Digest of one input file, supplied by the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDigest {
    /// `master` or `raw`.
    pub role: String,
    pub path: String,
    pub sha256: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MasterStats {
    pub districts: usize,
    pub states: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RowCounts {
    /// Records handed to the pipeline.
    pub raw: usize,
    /// CSV records the reader could not parse at all.
    pub skipped_malformed: usize,
    pub prepared: usize,
    pub collapsed: usize,
    pub distinct_pairs: usize,
    /// Prepared rows left out of district aggregation because they did not match.
    pub unresolved: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MetricTotal {
    pub column: String,
    /// All prepared rows.
    pub prepared: u128,
    /// Prepared rows that resolved to `matched`; every output level sums to this.
    pub matched: u128,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LevelStats {
    pub level: &'static str,
    pub months: usize,
    pub regions: usize,
    pub rows: usize,
    /// Grid cells whose metrics are all zero.
    pub zero_rows: usize,
}

impl LevelStats {
    pub fn of(level: &'static str, table: &Table, months: usize, regions: usize) -> Self {
        Self {
            level,
            months,
            regions,
            rows: table.len(),
            zero_rows: table.rows.iter().filter(|r| r.metrics.iter().all(|m| *m == 0)).count(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunSummary {
    pub metric_columns: Vec<String>,
    pub threshold: f64,
    pub region_source: RegionSource,
    pub month_domain: MonthDomain,
    /// False when the month order was derived from observed data.
    pub month_domain_explicit: bool,
    pub master: MasterStats,
    pub rows: RowCounts,
    pub exclusions: ExclusionCounts,
    pub status_rows: StatusCounts,
    pub status_pairs: StatusCounts,
    pub totals: Vec<MetricTotal>,
    pub levels: Vec<LevelStats>,
    pub validation: Vec<ValidationReport>,
    pub near_misses: Vec<NearMiss>,
    pub inputs: Vec<InputDigest>,
}
