//! State-scoped lookup over the District Master.
//!
//! Candidate order per state follows master insertion order; the resolver's
//! first-wins tie-break depends on it.

use std::collections::BTreeMap;

use geo_core::determinism::dedup_first_wins;
use geo_core::{DistrictMasterEntry, NormalizedKey};

#[derive(Clone, Debug, Default)]
pub struct MasterIndex {
    by_state: BTreeMap<String, Vec<String>>,
    pairs: Vec<NormalizedKey>,
    entries: usize,
}

impl MasterIndex {
    /// Entries with an empty state or district are ignored. Repeated
    /// `(state, district)` pairs collapse to their first occurrence.
    pub fn build(entries: &[DistrictMasterEntry]) -> Self {
        let all: Vec<NormalizedKey> = entries
            .iter()
            .filter(|e| !e.state_norm.is_empty() && !e.district_standard.is_empty())
            .map(|e| NormalizedKey::new(e.state_norm.clone(), e.district_standard.clone()))
            .collect();
        let (pairs, _dups) = dedup_first_wins(all, |k| k.clone());

        let mut by_state: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for k in &pairs {
            by_state.entry(k.state.clone()).or_default().push(k.district.clone());
        }
        Self { by_state, entries: pairs.len(), pairs }
    }

    pub fn states(&self) -> impl Iterator<Item = &str> {
        self.by_state.keys().map(String::as_str)
    }

    pub fn contains_state(&self, state: &str) -> bool {
        self.by_state.contains_key(state)
    }

    /// `None` when the state is unknown to the master.
    pub fn candidates(&self, state: &str) -> Option<&[String]> {
        self.by_state.get(state).map(Vec::as_slice)
    }

    /// Distinct canonical `(state, district)` pairs in master order.
    pub fn canonical_pairs(&self) -> &[NormalizedKey] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn state_count(&self) -> usize {
        self.by_state.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(s: &str, d: &str) -> DistrictMasterEntry {
        DistrictMasterEntry {
            state_norm: s.into(),
            district_standard: d.into(),
            district_lgd_code: String::new(),
        }
    }

    #[test]
    fn groups_by_state_in_insertion_order() {
        let idx = MasterIndex::build(&[
            entry("karnataka", "mysuru"),
            entry("andhra pradesh", "anantapur"),
            entry("karnataka", "bengaluru urban"),
            entry("karnataka", "mysuru"),
            entry("", "orphan"),
        ]);
        assert_eq!(idx.len(), 3);
        assert_eq!(idx.state_count(), 2);
        assert_eq!(idx.states().collect::<Vec<_>>(), vec!["andhra pradesh", "karnataka"]);
        assert_eq!(
            idx.candidates("karnataka").unwrap(),
            &["mysuru".to_string(), "bengaluru urban".to_string()]
        );
        assert!(idx.candidates("goa").is_none());
        assert_eq!(idx.canonical_pairs()[0], NormalizedKey::new("karnataka", "mysuru"));
    }

    #[test]
    fn empty_master_has_no_states() {
        let idx = MasterIndex::build(&[]);
        assert!(idx.is_empty());
        assert!(!idx.contains_state("goa"));
    }
}
