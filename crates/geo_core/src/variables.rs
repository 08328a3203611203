//! variables.rs — Pipeline configuration surface and safe defaults.
//!
//! Threshold, month order, metric columns and noise words are explicit
//! parameters; nothing downstream hard-codes them.

use std::collections::{BTreeMap, BTreeSet};

use crate::errors::CoreError;
use crate::month::MonthDomain;

/// ------------ Macros ------------

/// Define an enum with explicit wire tokens, `as_str` and `FromStr`.
macro_rules! wire_enum {
    ($name:ident, $err:ident => { $($variant:ident = $token:expr),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum $name {
            $(
                #[cfg_attr(feature = "serde", serde(rename = $token))]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self { $($name::$variant => $token,)+ }
            }
        }

        impl core::str::FromStr for $name {
            type Err = CoreError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($token => Ok($name::$variant),)+
                    other => Err(CoreError::$err(other.to_string())),
                }
            }
        }
    };
}

/// ------------ Canonical enums ------------

wire_enum!(MetricPreset, UnknownPreset => {
    Enrolment   = "enrolment",
    Biometric   = "biometric",
    Demographic = "demographic"
});

wire_enum!(RegionSource, UnknownRegionSource => {
    Master   = "master",
    Observed = "observed"
});

impl MetricPreset {
    /// Fixed metric columns of each raw feed shape.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            MetricPreset::Enrolment => &["age_0_5", "age_5_17", "age_18_greater"],
            MetricPreset::Biometric => &["bio_age_5_17", "bio_age_17_"],
            MetricPreset::Demographic => &["demo_age_5_17", "demo_age_17_"],
        }
    }

    pub fn column_names(self) -> Vec<String> {
        self.columns().iter().map(|c| c.to_string()).collect()
    }
}

impl Default for RegionSource {
    fn default() -> Self { RegionSource::Master }
}

/// ------------ Defaults ------------

pub const DEFAULT_THRESHOLD: f64 = 85.0;
pub const DEFAULT_NOISE_WORDS: [&str; 6] = ["district", "dist", "urban", "rural", "city", "nagar"];
pub const DEFAULT_LOW_CONFIDENCE_SAMPLE: usize = 10;

fn default_threshold() -> f64 { DEFAULT_THRESHOLD }
fn default_noise_words() -> Vec<String> {
    DEFAULT_NOISE_WORDS.iter().map(|w| w.to_string()).collect()
}
fn default_metric_columns() -> Vec<String> { MetricPreset::Enrolment.column_names() }
fn default_low_confidence_sample() -> usize { DEFAULT_LOW_CONFIDENCE_SAMPLE }

/// ------------ Params ------------

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct Params {
    /// Fuzzy-match acceptance threshold on a 0..=100 scale.
    #[cfg_attr(feature = "serde", serde(default = "default_threshold"))]
    pub threshold: f64,

    /// Explicit chronological order of valid periods. `None` derives it from the data.
    #[cfg_attr(feature = "serde", serde(default))]
    pub month_domain: Option<MonthDomain>,

    #[cfg_attr(feature = "serde", serde(default = "default_metric_columns"))]
    pub metric_columns: Vec<String>,

    #[cfg_attr(feature = "serde", serde(default = "default_noise_words"))]
    pub noise_words: Vec<String>,

    /// Where the district/state region domain for grid completion comes from.
    #[cfg_attr(feature = "serde", serde(default))]
    pub region_source: RegionSource,

    /// Normalized alias → normalized canonical state (e.g. `jammu kashmir` → `jammu and kashmir`).
    #[cfg_attr(feature = "serde", serde(default))]
    pub state_aliases: BTreeMap<String, String>,

    /// Per state: alias district → canonical district, applied before fuzzy
    /// matching (e.g. `andhra pradesh` → { `ananthapuramu` → `anantapur` }).
    #[cfg_attr(feature = "serde", serde(default))]
    pub district_aliases: BTreeMap<String, BTreeMap<String, String>>,

    /// How many low-confidence near-misses the run report lists.
    #[cfg_attr(feature = "serde", serde(default = "default_low_confidence_sample"))]
    pub low_confidence_sample: usize,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            month_domain: None,
            metric_columns: default_metric_columns(),
            noise_words: default_noise_words(),
            region_source: RegionSource::default(),
            state_aliases: BTreeMap::new(),
            district_aliases: BTreeMap::new(),
            low_confidence_sample: default_low_confidence_sample(),
        }
    }
}

impl Params {
    pub fn with_preset(preset: MetricPreset) -> Self {
        Self { metric_columns: preset.column_names(), ..Self::default() }
    }

    /// Domain checks run before any stage.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.threshold.is_finite() || !(0.0..=100.0).contains(&self.threshold) {
            return Err(CoreError::ThresholdOutOfRange);
        }
        if self.metric_columns.is_empty() {
            return Err(CoreError::EmptyMetricSet);
        }
        let mut seen = BTreeSet::new();
        for c in &self.metric_columns {
            if !seen.insert(c.as_str()) {
                return Err(CoreError::DuplicateMetric(c.clone()));
            }
        }
        // MonthDomain rejects duplicates at construction; re-assert for hand-built values.
        if let Some(d) = &self.month_domain {
            MonthDomain::new(d.months().to_vec())?;
        }
        Ok(())
    }
}
