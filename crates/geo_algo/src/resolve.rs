//! Fuzzy district resolution, scoped to the record's own state.
//!
//! Rules:
//! - State absent from the master        → `state_not_found` (no cross-state search)
//! - State present but no candidates     → `no_match`
//! - Best token-sort score ≥ threshold   → `matched`
//! - Otherwise                           → `low_confidence` (best candidate kept for audit)
//!
//! Ties keep the earliest candidate in master order.

use std::collections::BTreeMap;

use geo_core::{MatchStatus, NormalizedKey, Resolution};

use crate::index::MasterIndex;
use crate::similarity::token_sort_ratio;

/// Resolve one normalized `(state, district)` pair.
pub fn resolve(state: &str, district: &str, index: &MasterIndex, threshold: f64) -> Resolution {
    let Some(candidates) = index.candidates(state) else {
        return Resolution::state_not_found();
    };

    let mut best: Option<(&str, f64)> = None;
    for cand in candidates {
        let score = token_sort_ratio(district, cand);
        match best {
            Some((_, s)) if score <= s => {}
            _ => best = Some((cand.as_str(), score)),
        }
    }

    match best {
        None => Resolution::no_match(),
        Some((cand, score)) => Resolution {
            district: Some(cand.to_string()),
            score,
            status: if score >= threshold {
                MatchStatus::Matched
            } else {
                MatchStatus::LowConfidence
            },
        },
    }
}

/// A master index bound to a threshold.
#[derive(Clone, Copy, Debug)]
pub struct Resolver<'a> {
    index: &'a MasterIndex,
    threshold: f64,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a MasterIndex, threshold: f64) -> Self {
        Self { index, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn index(&self) -> &'a MasterIndex {
        self.index
    }

    pub fn resolve(&self, key: &NormalizedKey) -> Resolution {
        resolve(&key.state, &key.district, self.index, self.threshold)
    }

    /// Resolve each distinct pair once. The result is keyed and ordered by pair,
    /// independent of input order and of the `parallel` feature.
    pub fn resolve_distinct<'k, I>(&self, keys: I) -> BTreeMap<NormalizedKey, Resolution>
    where
        I: IntoIterator<Item = &'k NormalizedKey>,
    {
        let distinct: Vec<&NormalizedKey> = {
            let mut v: Vec<&NormalizedKey> = keys.into_iter().collect();
            v.sort();
            v.dedup();
            v
        };

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            distinct
                .par_iter()
                .map(|k| ((*k).clone(), self.resolve(k)))
                .collect::<Vec<_>>()
                .into_iter()
                .collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            distinct.into_iter().map(|k| (k.clone(), self.resolve(k))).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_core::DistrictMasterEntry;
    use proptest::prelude::*;

    fn master(rows: &[(&str, &str)]) -> MasterIndex {
        let entries: Vec<DistrictMasterEntry> = rows
            .iter()
            .map(|(s, d)| DistrictMasterEntry {
                state_norm: s.to_string(),
                district_standard: d.to_string(),
                district_lgd_code: String::new(),
            })
            .collect();
        MasterIndex::build(&entries)
    }

    #[test]
    fn spelling_variant_matches_within_state() {
        let idx = master(&[("andhra pradesh", "anantapur"), ("andhra pradesh", "chittoor")]);
        let r = resolve("andhra pradesh", "ananthapur", &idx, 85.0);
        assert_eq!(r.status, MatchStatus::Matched);
        assert_eq!(r.district.as_deref(), Some("anantapur"));
        assert!(r.score >= 85.0 && r.score <= 100.0);
    }

    #[test]
    fn punctuated_suffix_does_not_cost_the_match() {
        let idx = master(&[("andhra pradesh", "anantapur")]);
        let n = crate::Normalizer::default();
        let district = n.normalize(Some("Ananthapur Dist."));
        let r = resolve("andhra pradesh", &district, &idx, 85.0);
        assert_eq!(r.status, MatchStatus::Matched);
        assert_eq!(r.district.as_deref(), Some("anantapur"));
    }

    #[test]
    fn unknown_state_is_reported_not_searched() {
        let idx = master(&[("karnataka", "anantapur")]);
        let r = resolve("andhra pradesh", "anantapur", &idx, 85.0);
        assert_eq!(r, Resolution::state_not_found());
    }

    #[test]
    fn below_threshold_keeps_best_candidate_for_audit() {
        let idx = master(&[("goa", "north goa"), ("goa", "south goa")]);
        let r = resolve("goa", "panaji", &idx, 85.0);
        assert_eq!(r.status, MatchStatus::LowConfidence);
        assert!(r.district.is_some());
        assert!(r.score < 85.0);
    }

    #[test]
    fn ties_go_to_first_candidate() {
        let idx = master(&[("x", "ab"), ("x", "ba")]);
        // "a" vs "ab" and "a" vs "ba" both score 2/3.
        let r = resolve("x", "a", &idx, 0.0);
        assert_eq!(r.district.as_deref(), Some("ab"));
        assert_eq!(r.status, MatchStatus::Matched);
    }

    #[test]
    fn distinct_resolution_collapses_repeats() {
        let idx = master(&[("goa", "north goa")]);
        let keys = vec![
            NormalizedKey::new("goa", "north goa"),
            NormalizedKey::new("kerala", "idukki"),
            NormalizedKey::new("goa", "north goa"),
        ];
        let out = Resolver::new(&idx, 85.0).resolve_distinct(&keys);
        assert_eq!(out.len(), 2);
        assert_eq!(out[&keys[0]].status, MatchStatus::Matched);
        assert_eq!(out[&keys[1]].status, MatchStatus::StateNotFound);
    }

    proptest! {
        #[test]
        fn raising_threshold_never_creates_matches(
            d in "[a-z]{1,10}",
            lo in 0.0f64..100.0,
            delta in 0.0f64..50.0,
        ) {
            let idx = master(&[("s", "anantapur"), ("s", "chittoor"), ("s", "kurnool")]);
            let hi = (lo + delta).min(100.0);
            let a = resolve("s", &d, &idx, lo);
            let b = resolve("s", &d, &idx, hi);
            prop_assert_eq!(&a.district, &b.district);
            prop_assert!((a.score - b.score).abs() < 1e-12);
            if b.is_matched() {
                prop_assert!(a.is_matched());
            }
        }

        #[test]
        fn resolution_never_leaves_the_state(d in "[a-z ]{1,12}") {
            let idx = master(&[("a", "alpha"), ("a", "beta"), ("b", "gamma")]);
            let r = resolve("a", &d, &idx, 85.0);
            if let Some(c) = r.district {
                prop_assert!(idx.candidates("a").unwrap().contains(&c));
            }
        }
    }
}
