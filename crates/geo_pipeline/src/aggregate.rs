//! AGGREGATE: the one grouped-sum used at every granularity.
//!
//! Raw-duplicate collapse, district, state and national rollups differ only in
//! the active key set. Groups come out in `GroupKey` order (months
//! chronological); zero-sum groups are kept.

use std::collections::BTreeMap;

use geo_core::{GroupKey, KeyField, Keyed, Row, Table};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("record {index} carries no {field} key")]
    MissingKey { index: usize, field: &'static str },

    #[error("record {index} has {got} metrics, expected {expected}")]
    Width { index: usize, expected: usize, got: usize },

    #[error("metric {column} overflowed while summing group ({key})")]
    Overflow { column: String, key: String },
}

/// Group `records` by the exact tuple of `key_fields` and sum every metric
/// column independently.
pub fn aggregate<R: Keyed>(
    records: &[R],
    key_fields: &[KeyField],
    metric_columns: &[String],
) -> Result<Table, AggregateError> {
    let width = metric_columns.len();
    let mut groups: BTreeMap<GroupKey, Vec<u64>> = BTreeMap::new();

    for (index, rec) in records.iter().enumerate() {
        let metrics = rec.metrics();
        if metrics.len() != width {
            return Err(AggregateError::Width { index, expected: width, got: metrics.len() });
        }
        let key = key_fields
            .iter()
            .map(|&f| {
                rec.key_value(f)
                    .ok_or(AggregateError::MissingKey { index, field: f.column() })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(GroupKey::new)?;

        let sums = groups.entry(key).or_insert_with(|| vec![0; width]);
        for (col, (acc, v)) in sums.iter_mut().zip(metrics).enumerate() {
            match acc.checked_add(*v) {
                Some(s) => *acc = s,
                None => {
                    return Err(AggregateError::Overflow {
                        column: metric_columns[col].clone(),
                        key: GroupKey::new(
                            key_fields.iter().filter_map(|&f| rec.key_value(f)).collect(),
                        )
                        .describe(),
                    })
                }
            }
        }
    }

    let mut table = Table::new(key_fields.to_vec(), metric_columns.to_vec());
    table.rows = groups.into_iter().map(|(key, metrics)| Row { key, metrics }).collect();
    Ok(table)
}
