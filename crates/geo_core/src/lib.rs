//! geo_core — Core types, configuration domain, ordering helpers.
//!
//! This crate is **I/O-free**. It defines the stable types used across the
//! workspace (`geo_algo`, `geo_io`, `geo_pipeline`, `geo_report`, `geo_cli`).
//!
//! - Calendar months with chronological order and `"%B %Y"` labels
//! - Group keys (`KeyField`/`KeyValue`/`GroupKey`) and generic table rows
//! - District master entries, match status, resolutions
//! - `Params`: threshold, month order, metric columns, noise words
//! - First-wins deduplication
//!
//! Serialization derives are gated behind the `serde` feature.

pub mod errors {
    use core::fmt;

    /// Minimal error set for core-domain validation & parsing.
    #[derive(Clone, Debug, Eq, PartialEq)]
    pub enum CoreError {
        InvalidMonth(String),
        DuplicateMonth(String),
        EmptyMetricSet,
        DuplicateMetric(String),
        ThresholdOutOfRange,
        MetricWidthMismatch { expected: usize, got: usize },
        MetricOverflow(&'static str),
        UnknownPreset(String),
        UnknownRegionSource(String),
    }

    impl fmt::Display for CoreError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                CoreError::InvalidMonth(s) => write!(f, "invalid month label: {s:?}"),
                CoreError::DuplicateMonth(s) => write!(f, "duplicate month in domain: {s}"),
                CoreError::EmptyMetricSet => write!(f, "metric column set is empty"),
                CoreError::DuplicateMetric(s) => write!(f, "duplicate metric column: {s}"),
                CoreError::ThresholdOutOfRange => write!(f, "threshold must lie within 0..=100"),
                CoreError::MetricWidthMismatch { expected, got } => {
                    write!(f, "metric width mismatch: expected {expected}, got {got}")
                }
                CoreError::MetricOverflow(ctx) => write!(f, "metric sum overflowed: {ctx}"),
                CoreError::UnknownPreset(s) => write!(f, "unknown metric preset: {s}"),
                CoreError::UnknownRegionSource(s) => write!(f, "unknown region source: {s}"),
            }
        }
    }

    impl std::error::Error for CoreError {}
}

pub mod determinism;
pub mod entities;
pub mod keys;
pub mod month;
pub mod variables;

pub use entities::{
    coerce_count, DistrictMasterEntry, MatchStatus, NormalizedKey, RawRecord, Resolution,
    ResolvedRecord, StatusCounts,
};
pub use errors::CoreError;
pub use keys::{GroupKey, KeyField, KeyValue, Keyed, Row, Table};
pub use month::{Month, MonthDomain};
pub use variables::{MetricPreset, Params, RegionSource};
