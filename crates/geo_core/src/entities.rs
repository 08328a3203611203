//! Records flowing through the pipeline and the canonical reference entry.

use core::fmt;

use chrono::NaiveDate;

use crate::keys::{KeyField, KeyValue, Keyed, Row};
use crate::month::Month;

/// One row of a raw source file, metrics already coerced.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RawRecord {
    pub date: Option<NaiveDate>,
    /// Feeds that are already monthly carry the month directly.
    pub month: Option<Month>,
    pub state_raw: Option<String>,
    pub district_raw: Option<String>,
    pub pincode: Option<u32>,
    pub metrics: Vec<u64>,
}

impl RawRecord {
    /// Explicit month if present, otherwise the month of `date`.
    pub fn effective_month(&self) -> Option<Month> {
        self.month.or_else(|| self.date.map(Month::from_date))
    }
}

/// Coerce a raw metric cell to a count. Unparsable values become 0 and the row is kept.
///
/// Accepted: unsigned integers and integral, non-negative decimals (`"12.0"`).
pub fn coerce_count(text: &str) -> u64 {
    let t = text.trim();
    if t.is_empty() {
        return 0;
    }
    if let Ok(v) = t.parse::<u64>() {
        return v;
    }
    match t.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => f as u64,
        _ => 0,
    }
}

/// `(state_norm, district_norm)` after text normalization.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NormalizedKey {
    pub state: String,
    pub district: String,
}

impl NormalizedKey {
    pub fn new(state: impl Into<String>, district: impl Into<String>) -> Self {
        Self { state: state.into(), district: district.into() }
    }
}

/// One canonical administrative district.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistrictMasterEntry {
    pub state_norm: String,
    pub district_standard: String,
    pub district_lgd_code: String,
}

/// Outcome class of a fuzzy resolution.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MatchStatus {
    Matched,
    LowConfidence,
    NoMatch,
    StateNotFound,
}

impl MatchStatus {
    pub const ALL: [MatchStatus; 4] = [
        MatchStatus::Matched,
        MatchStatus::LowConfidence,
        MatchStatus::NoMatch,
        MatchStatus::StateNotFound,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Matched => "matched",
            MatchStatus::LowConfidence => "low_confidence",
            MatchStatus::NoMatch => "no_match",
            MatchStatus::StateNotFound => "state_not_found",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolver output. `district` is the best candidate even when rejected, for audit.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Resolution {
    pub district: Option<String>,
    /// 0..=100
    pub score: f64,
    pub status: MatchStatus,
}

impl Resolution {
    pub fn state_not_found() -> Self {
        Self { district: None, score: 0.0, status: MatchStatus::StateNotFound }
    }

    pub fn no_match() -> Self {
        Self { district: None, score: 0.0, status: MatchStatus::NoMatch }
    }

    pub fn is_matched(&self) -> bool {
        self.status == MatchStatus::Matched
    }
}

/// A (collapsed) row augmented with its resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedRecord {
    pub row: Row,
    pub resolution: Resolution,
}

impl ResolvedRecord {
    pub fn normalized_key(&self) -> Option<NormalizedKey> {
        match (self.row.key.get(KeyField::State), self.row.key.get(KeyField::DistrictNorm)) {
            (Some(KeyValue::State(s)), Some(KeyValue::DistrictNorm(d))) => {
                Some(NormalizedKey::new(s.clone(), d.clone()))
            }
            _ => None,
        }
    }

    /// Canonical district usable as a grouping key (matched rows only).
    pub fn district_resolved(&self) -> Option<&str> {
        if self.resolution.is_matched() {
            self.resolution.district.as_deref()
        } else {
            None
        }
    }
}

impl Keyed for ResolvedRecord {
    fn key_value(&self, field: KeyField) -> Option<KeyValue> {
        match field {
            KeyField::District => self.district_resolved().map(|d| KeyValue::District(d.to_string())),
            other => self.row.key.get(other).cloned(),
        }
    }
    fn metrics(&self) -> &[u64] {
        &self.row.metrics
    }
}

/// Per-status counters.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusCounts {
    pub matched: u64,
    pub low_confidence: u64,
    pub no_match: u64,
    pub state_not_found: u64,
}

impl StatusCounts {
    pub fn add(&mut self, status: MatchStatus, n: u64) {
        match status {
            MatchStatus::Matched => self.matched += n,
            MatchStatus::LowConfidence => self.low_confidence += n,
            MatchStatus::NoMatch => self.no_match += n,
            MatchStatus::StateNotFound => self.state_not_found += n,
        }
    }

    pub fn get(&self, status: MatchStatus) -> u64 {
        match status {
            MatchStatus::Matched => self.matched,
            MatchStatus::LowConfidence => self.low_confidence,
            MatchStatus::NoMatch => self.no_match,
            MatchStatus::StateNotFound => self.state_not_found,
        }
    }

    pub fn total(&self) -> u64 {
        self.matched + self.low_confidence + self.no_match + self.state_not_found
    }

    /// Everything that did not reach `matched`.
    pub fn unresolved(&self) -> u64 {
        self.total() - self.matched
    }

    pub fn iter(&self) -> impl Iterator<Item = (MatchStatus, u64)> + '_ {
        MatchStatus::ALL.into_iter().map(move |s| (s, self.get(s)))
    }
}
