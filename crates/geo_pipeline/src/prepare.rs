//! PREPARE stage: raw records → keyed rows ready for collapse.
//!
//! Normalizes state and district, applies state and district aliases, derives
//! the month, and excludes (and counts) rows that cannot take part in resolution.

use std::collections::BTreeMap;

use geo_algo::Normalizer;
use geo_core::{GroupKey, KeyField, KeyValue, Month, MonthDomain, RawRecord, Row};
use serde::Serialize;

/// Key of a prepared row, also the raw-duplicate collapse key.
pub const PREPARED_KEY: [KeyField; 5] = [
    KeyField::Date,
    KeyField::Month,
    KeyField::State,
    KeyField::DistrictNorm,
    KeyField::Pincode,
];

/// Why rows never reached resolution. Each row is counted once, under the
/// first reason that applies (in field order).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ExclusionCounts {
    pub empty_state: u64,
    pub empty_district: u64,
    pub missing_month: u64,
    pub outside_month_domain: u64,
}

impl ExclusionCounts {
    pub fn total(&self) -> u64 {
        self.empty_state + self.empty_district + self.missing_month + self.outside_month_domain
    }
}

#[derive(Clone, Debug, Default)]
pub struct Prepared {
    /// Keyed by `PREPARED_KEY`, in input order.
    pub rows: Vec<Row>,
    pub exclusions: ExclusionCounts,
}

impl Prepared {
    pub fn months(&self) -> impl Iterator<Item = Month> + '_ {
        self.rows
            .iter()
            .filter_map(|r| r.key.get(KeyField::Month).and_then(KeyValue::as_month))
    }
}

/// Alias tables keyed the way `prepare` looks them up.
#[derive(Clone, Debug, Default)]
pub struct Aliases {
    states: BTreeMap<String, String>,
    districts: BTreeMap<(String, String), String>,
}

impl Aliases {
    /// Alias keys are normalized like feed names, targets like master names.
    /// District alias states pass through the state aliases, so either the
    /// feed spelling or the canonical state may be used as the key.
    pub fn new(
        normalizer: &Normalizer,
        states: &BTreeMap<String, String>,
        districts: &BTreeMap<String, BTreeMap<String, String>>,
    ) -> Self {
        let states: BTreeMap<String, String> = states
            .iter()
            .map(|(k, v)| (normalizer.normalize_str(k), geo_algo::canonical_letters(v)))
            .filter(|(k, v)| !k.is_empty() && !v.is_empty())
            .collect();
        let mut out = Self { states, districts: BTreeMap::new() };
        for (state, table) in districts {
            let state = out.state(normalizer.normalize_str(state));
            if state.is_empty() {
                continue;
            }
            for (alias, canon) in table {
                let (alias, canon) = (normalizer.normalize_str(alias), geo_algo::canonical_letters(canon));
                if !alias.is_empty() && !canon.is_empty() {
                    out.districts.insert((state.clone(), alias), canon);
                }
            }
        }
        out
    }

    pub fn state(&self, state: String) -> String {
        self.states.get(&state).cloned().unwrap_or(state)
    }

    pub fn district(&self, state: &str, district: String) -> String {
        if self.districts.is_empty() {
            return district;
        }
        match self.districts.get(&(state.to_string(), district.clone())) {
            Some(canon) => canon.clone(),
            None => district,
        }
    }
}

pub fn prepare(
    raw: &[RawRecord],
    normalizer: &Normalizer,
    aliases: &Aliases,
    month_domain: Option<&MonthDomain>,
) -> Prepared {
    let mut out = Prepared { rows: Vec::with_capacity(raw.len()), ..Prepared::default() };
    let ex = &mut out.exclusions;

    for rec in raw {
        let state = aliases.state(normalizer.normalize(rec.state_raw.as_deref()));
        if state.is_empty() {
            ex.empty_state += 1;
            continue;
        }
        let district = aliases.district(&state, normalizer.normalize(rec.district_raw.as_deref()));
        if district.is_empty() {
            ex.empty_district += 1;
            continue;
        }
        let Some(month) = rec.effective_month() else {
            ex.missing_month += 1;
            continue;
        };
        if month_domain.is_some_and(|d| !d.contains(&month)) {
            ex.outside_month_domain += 1;
            continue;
        }
        out.rows.push(Row {
            key: GroupKey::new(vec![
                KeyValue::Date(rec.date),
                KeyValue::Month(month),
                KeyValue::State(state),
                KeyValue::DistrictNorm(district),
                KeyValue::Pincode(rec.pincode),
            ]),
            metrics: rec.metrics.clone(),
        });
    }
    out
}
