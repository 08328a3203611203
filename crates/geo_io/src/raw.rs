//! Raw feed readers.
//!
//! Header-driven: columns are located by name (trimmed, case-insensitive), so
//! exports with extra or reordered columns read the same. Required: `state`,
//! `district` and every configured metric column. Optional: `date`, `month`,
//! `pincode`.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use geo_core::{coerce_count, Month, RawRecord};
use tracing::{debug, warn};

use crate::{csv_err, IoError};

/// Day-first formats first; the feeds are Indian exports.
const DATE_FORMATS: [&str; 3] = ["%d-%m-%Y", "%d/%m/%Y", "%Y-%m-%d"];

/// Records read from one or more exports.
#[derive(Clone, Debug, Default)]
pub struct RawBatch {
    pub records: Vec<RawRecord>,
    /// CSV records that could not be read at all (ragged, bad UTF-8, ...).
    pub skipped: usize,
    pub sources: Vec<PathBuf>,
}

impl RawBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn extend(&mut self, other: RawBatch) {
        self.records.extend(other.records);
        self.skipped += other.skipped;
        self.sources.extend(other.sources);
    }
}

struct Columns {
    state: usize,
    district: usize,
    date: Option<usize>,
    month: Option<usize>,
    pincode: Option<usize>,
    metrics: Vec<usize>,
}

fn find(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn locate(headers: &StringRecord, metric_columns: &[String], path: &Path) -> Result<Columns, IoError> {
    let need = |name: &str| {
        find(headers, name).ok_or_else(|| IoError::MissingColumn {
            path: path.display().to_string(),
            column: name.to_string(),
        })
    };
    Ok(Columns {
        state: need("state")?,
        district: need("district")?,
        date: find(headers, "date"),
        month: find(headers, "month"),
        pincode: find(headers, "pincode"),
        metrics: metric_columns.iter().map(|c| need(c.as_str())).collect::<Result<_, _>>()?,
    })
}

fn cell<'r>(rec: &'r StringRecord, idx: usize) -> Option<&'r str> {
    rec.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let t = text.trim();
    DATE_FORMATS.iter().find_map(|f| NaiveDate::parse_from_str(t, f).ok())
}

fn parse_pincode(text: &str) -> Option<u32> {
    match coerce_count(text) {
        0 => None,
        n => u32::try_from(n).ok(),
    }
}

fn to_record(rec: &StringRecord, cols: &Columns) -> RawRecord {
    RawRecord {
        date: cols.date.and_then(|i| cell(rec, i)).and_then(parse_date),
        month: cols.month.and_then(|i| cell(rec, i)).and_then(|s| s.parse::<Month>().ok()),
        state_raw: cell(rec, cols.state).map(str::to_string),
        district_raw: cell(rec, cols.district).map(str::to_string),
        pincode: cols.pincode.and_then(|i| cell(rec, i)).and_then(parse_pincode),
        metrics: cols
            .metrics
            .iter()
            .map(|&i| rec.get(i).map(coerce_count).unwrap_or(0))
            .collect(),
    }
}

/// Read one raw export. Unparsable metric cells become 0; unparsable dates,
/// months and pincodes become absent.
pub fn read_raw_csv(path: &Path, metric_columns: &[String]) -> Result<RawBatch, IoError> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_err(path, e))?;
    let headers = rdr.headers().map_err(|e| csv_err(path, e))?.clone();
    let cols = locate(&headers, metric_columns, path)?;

    let mut batch = RawBatch { sources: vec![path.to_path_buf()], ..RawBatch::default() };
    for (line, result) in rdr.records().enumerate() {
        match result {
            Ok(rec) => batch.records.push(to_record(&rec, &cols)),
            Err(e) if e.is_io_error() => return Err(csv_err(path, e)),
            Err(e) => {
                batch.skipped += 1;
                debug!(path = %path.display(), record = line + 1, error = %e, "skipping malformed record");
            }
        }
    }
    if batch.skipped > 0 {
        warn!(path = %path.display(), skipped = batch.skipped, "malformed records skipped");
    }
    debug!(path = %path.display(), records = batch.records.len(), "raw export read");
    Ok(batch)
}

/// Read several exports in order into one batch.
pub fn read_raw_csvs<P: AsRef<Path>>(paths: &[P], metric_columns: &[String]) -> Result<RawBatch, IoError> {
    let mut all = RawBatch::default();
    for p in paths {
        all.extend(read_raw_csv(p.as_ref(), metric_columns)?);
    }
    Ok(all)
}
