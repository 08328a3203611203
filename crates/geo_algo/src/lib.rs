// crates/geo_algo/src/lib.rs
#![forbid(unsafe_code)]

//! Pure string algorithms for district resolution. No I/O, no logging.

pub use geo_core::{DistrictMasterEntry, MatchStatus, NormalizedKey, Resolution};

// ----------------------------- Normalization -----------------------------------------

pub mod normalize;
pub use normalize::{
    canonical_letters, normalize_master_district, normalize_master_state, Normalizer,
};

// ----------------------------- Similarity --------------------------------------------

pub mod similarity;
pub use similarity::{ratio, token_sort_ratio};

// ----------------------------- Master index & resolution -----------------------------

pub mod index;
pub mod resolve;

pub use index::MasterIndex;
pub use resolve::{resolve, Resolver};
