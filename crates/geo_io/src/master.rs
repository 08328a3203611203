//! District master: reading the canonical table, building it from the raw
//! LGD key export, and writing it back.

use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use geo_algo::{canonical_letters, normalize_master_district, normalize_master_state};
use geo_core::determinism::dedup_first_wins;
use geo_core::DistrictMasterEntry;
use serde::Deserialize;
use tracing::{info, warn};

use crate::canonical_json::write_atomic;
use crate::{csv_err, IoError};

/// Entries kept plus what was dropped on the way.
#[derive(Clone, Debug, Default)]
pub struct MasterLoad {
    pub entries: Vec<DistrictMasterEntry>,
    /// Rows whose state or district is empty after normalization.
    pub empty: usize,
    /// Repeated `(state_norm, district_standard)` pairs (first occurrence kept).
    pub duplicates: usize,
}

#[derive(Debug, Deserialize)]
struct MasterRow {
    state_norm: Option<String>,
    district_standard: Option<String>,
    #[serde(default)]
    district_lgd_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LgdRow {
    #[serde(rename = "State Name")]
    state: Option<String>,
    #[serde(rename = "District Name (In English)")]
    district: Option<String>,
    #[serde(rename = "District LGD Code", default)]
    lgd_code: Option<String>,
}

fn finish(candidates: Vec<DistrictMasterEntry>, mut empty: usize) -> MasterLoad {
    let before = candidates.len();
    let non_empty: Vec<DistrictMasterEntry> = candidates
        .into_iter()
        .filter(|e| !e.state_norm.is_empty() && !e.district_standard.is_empty())
        .collect();
    empty += before - non_empty.len();
    let (entries, duplicates) = dedup_first_wins(non_empty, |e| {
        (e.state_norm.clone(), e.district_standard.clone())
    });
    MasterLoad { entries, empty, duplicates }
}

fn deserialize_all<T, F>(path: &Path, mut map: F) -> Result<(Vec<DistrictMasterEntry>, usize), IoError>
where
    T: for<'de> Deserialize<'de>,
    F: FnMut(T) -> DistrictMasterEntry,
{
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| csv_err(path, e))?;
    let mut out = Vec::new();
    let mut bad = 0usize;
    for result in rdr.deserialize::<T>() {
        match result {
            Ok(row) => out.push(map(row)),
            Err(e) if e.is_io_error() => return Err(csv_err(path, e)),
            Err(e) => {
                bad += 1;
                warn!(path = %path.display(), error = %e, "skipping unreadable master row");
            }
        }
    }
    Ok((out, bad))
}

/// Read a canonical master (`state_norm, district_standard, district_lgd_code`).
/// Names are re-canonicalized so hand-edited masters still line up with
/// normalized feed keys.
pub fn read_master_csv(path: &Path) -> Result<MasterLoad, IoError> {
    let (rows, bad) = deserialize_all(path, |r: MasterRow| DistrictMasterEntry {
        state_norm: canonical_letters(r.state_norm.as_deref().unwrap_or_default()),
        district_standard: canonical_letters(r.district_standard.as_deref().unwrap_or_default()),
        district_lgd_code: r.district_lgd_code.unwrap_or_default(),
    })?;
    let load = finish(rows, bad);
    if load.duplicates > 0 {
        warn!(duplicates = load.duplicates, "duplicate master pairs dropped");
    }
    info!(path = %path.display(), districts = load.entries.len(), "district master loaded");
    Ok(load)
}

/// Build the canonical master from the government LGD key export
/// (`State Name`, `District Name (In English)`, `District LGD Code`).
pub fn build_master_from_lgd_csv(path: &Path) -> Result<MasterLoad, IoError> {
    let (rows, bad) = deserialize_all(path, |r: LgdRow| DistrictMasterEntry {
        state_norm: normalize_master_state(r.state.as_deref()),
        district_standard: normalize_master_district(r.district.as_deref()),
        district_lgd_code: r.lgd_code.unwrap_or_default(),
    })?;
    let load = finish(rows, bad);
    info!(
        path = %path.display(),
        districts = load.entries.len(),
        empty = load.empty,
        duplicates = load.duplicates,
        "district master built"
    );
    Ok(load)
}

pub fn write_master_csv(path: &Path, entries: &[DistrictMasterEntry]) -> Result<(), IoError> {
    let mut w = WriterBuilder::new().from_writer(Vec::new());
    w.write_record(["state_norm", "district_standard", "district_lgd_code"])
        .map_err(|e| csv_err(path, e))?;
    for e in entries {
        w.write_record([&e.state_norm, &e.district_standard, &e.district_lgd_code])
            .map_err(|e| csv_err(path, e))?;
    }
    let bytes = w.into_inner().map_err(|e| IoError::Path(e.to_string()))?;
    write_atomic(path, &bytes)
}
