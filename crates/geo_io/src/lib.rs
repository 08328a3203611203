//! crates/geo_io/src/lib.rs
//! File-facing layer of the workspace. The pipeline itself never touches paths;
//! everything here turns files into `geo_core` values and back.
//!
//! - Raw feed CSVs → `RawBatch` (header-driven, malformed records counted)
//! - District master CSV (and the raw LGD key export) → `DistrictMasterEntry`s
//! - `Table` → CSV
//! - Params JSON → `Params`
//! - Canonical JSON artifacts and SHA-256 input digests

#![forbid(unsafe_code)]

use geo_core::CoreError;
use thiserror::Error;

/// Unified error for geo_io.
#[derive(Debug, Error)]
pub enum IoError {
    /// Filesystem / path errors (open, create_dir_all, rename, ...).
    #[error("io/path error: {0}")]
    Path(String),

    /// The CSV reader/writer failed outside of a single skippable record.
    #[error("csv error in {path}: {msg}")]
    Csv { path: String, msg: String },

    /// A required header is absent.
    #[error("missing column {column:?} in {path}")]
    MissingColumn { path: String, column: String },

    /// JSON serialization/deserialization errors.
    #[error("json error at {pointer}: {msg}")]
    Json { pointer: String, msg: String },

    /// Hashing-related failures.
    #[error("hash error: {0}")]
    Hash(String),

    /// Loaded values violate the configuration domain.
    #[error("invalid: {0}")]
    Invalid(String),
}

pub type IoResult<T> = Result<T, IoError>;

/* ---------------- From conversions (used by file modules) ---------------- */

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Path(e.to_string())
    }
}

impl From<serde_json::Error> for IoError {
    fn from(e: serde_json::Error) -> Self {
        IoError::Json {
            pointer: format!("line {} column {}", e.line(), e.column()),
            msg: e.to_string(),
        }
    }
}

impl From<CoreError> for IoError {
    fn from(e: CoreError) -> Self {
        IoError::Invalid(e.to_string())
    }
}

pub(crate) fn csv_err(path: &std::path::Path, e: csv::Error) -> IoError {
    if e.is_io_error() {
        return IoError::Path(format!("{}: {e}", path.display()));
    }
    IoError::Csv { path: path.display().to_string(), msg: e.to_string() }
}

/* ---------------- Modules ---------------- */

pub mod canonical_json;
pub mod hasher;
pub mod master;
pub mod params;
pub mod raw;
pub mod table;

pub use master::{build_master_from_lgd_csv, read_master_csv, write_master_csv, MasterLoad};
pub use params::load_params;
pub use raw::{read_raw_csv, read_raw_csvs, RawBatch};
pub use table::write_table_csv;
