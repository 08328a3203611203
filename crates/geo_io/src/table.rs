//! Output tables as CSV: key columns, then metric columns.

use std::path::Path;

use csv::WriterBuilder;
use geo_core::Table;
use tracing::debug;

use crate::canonical_json::write_atomic;
use crate::{csv_err, IoError};

pub fn table_to_csv_bytes(table: &Table, path: &Path) -> Result<Vec<u8>, IoError> {
    let mut w = WriterBuilder::new().from_writer(Vec::new());
    w.write_record(table.header()).map_err(|e| csv_err(path, e))?;
    for row in &table.rows {
        let cells = row
            .key
            .values()
            .iter()
            .map(|v| v.render())
            .chain(row.metrics.iter().map(u64::to_string));
        w.write_record(cells).map_err(|e| csv_err(path, e))?;
    }
    w.into_inner().map_err(|e| IoError::Path(e.to_string()))
}

pub fn write_table_csv(path: &Path, table: &Table) -> Result<(), IoError> {
    let bytes = table_to_csv_bytes(table, path)?;
    write_atomic(path, &bytes)?;
    debug!(path = %path.display(), rows = table.len(), "table written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_core::{GroupKey, KeyField, KeyValue, Row};

    #[test]
    fn header_then_rows() {
        let mut t = Table::new(
            vec![KeyField::Month, KeyField::State],
            vec!["age_0_5".into(), "age_5_17".into()],
        );
        t.rows.push(Row {
            key: GroupKey::new(vec![
                KeyValue::Month("March 2025".parse().unwrap()),
                KeyValue::State("andhra pradesh".into()),
            ]),
            metrics: vec![15, 0],
        });
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("state_monthly.csv");
        write_table_csv(&p, &t).unwrap();
        assert_eq!(
            std::fs::read_to_string(&p).unwrap(),
            "month,state_norm,age_0_5,age_5_17\nMarch 2025,andhra pradesh,15,0\n"
        );
    }
}
