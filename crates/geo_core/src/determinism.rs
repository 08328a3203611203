//! Determinism utilities: first-wins deduplication.
//!
//! This module is **I/O-free**. Master entries and index pairs go through
//! `dedup_first_wins`, so the survivor of a duplicate is always the earliest.

use std::collections::BTreeSet;

/* -------------------------------------------------------------------------- */
/*                               Deduplication                                */
/* -------------------------------------------------------------------------- */

/// Keep the first item per key, preserving input order. Returns the survivors
/// and the number of dropped duplicates.
pub fn dedup_first_wins<T, K, F>(items: Vec<T>, key: F) -> (Vec<T>, usize)
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut seen = BTreeSet::new();
    let before = items.len();
    let kept: Vec<T> = items.into_iter().filter(|it| seen.insert(key(it))).collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

/* ---------------------------------- Tests --------------------------------- */
