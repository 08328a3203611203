//! Group keys and generic table rows.
//!
//! Every aggregation granularity (raw-duplicate collapse, district, state,
//! national) groups by some subset of the same key fields, so a row carries its
//! key as a self-describing tuple of `KeyValue`s and one grouped-sum serves all.

use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::month::Month;

/// Columns that can participate in a grouping key.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum KeyField {
    Date,
    Month,
    State,
    /// Normalized raw district text (pre-resolution).
    DistrictNorm,
    /// Canonical district name; only present on `matched` rows.
    District,
    Pincode,
}

impl KeyField {
    /// Output column name.
    pub fn column(self) -> &'static str {
        match self {
            KeyField::Date => "date",
            KeyField::Month => "month",
            KeyField::State => "state_norm",
            KeyField::DistrictNorm => "district_norm",
            KeyField::District => "district_resolved",
            KeyField::Pincode => "pincode",
        }
    }

    /// Geographic and time keys must never be null after resolution.
    /// Date and pincode are optional dedup helpers.
    pub fn is_required(self) -> bool {
        !matches!(self, KeyField::Date | KeyField::Pincode)
    }
}

/// A key value tagged with the field it belongs to.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum KeyValue {
    Date(Option<NaiveDate>),
    Month(Month),
    State(String),
    DistrictNorm(String),
    District(String),
    Pincode(Option<u32>),
}

impl KeyValue {
    pub fn field(&self) -> KeyField {
        match self {
            KeyValue::Date(_) => KeyField::Date,
            KeyValue::Month(_) => KeyField::Month,
            KeyValue::State(_) => KeyField::State,
            KeyValue::DistrictNorm(_) => KeyField::DistrictNorm,
            KeyValue::District(_) => KeyField::District,
            KeyValue::Pincode(_) => KeyField::Pincode,
        }
    }

    /// Absent optional value or empty text.
    pub fn is_null(&self) -> bool {
        match self {
            KeyValue::Date(d) => d.is_none(),
            KeyValue::Month(_) => false,
            KeyValue::State(s) | KeyValue::DistrictNorm(s) | KeyValue::District(s) => {
                s.trim().is_empty()
            }
            KeyValue::Pincode(p) => p.is_none(),
        }
    }

    /// Cell text for tabular output (empty for absent optionals).
    pub fn render(&self) -> String {
        match self {
            KeyValue::Date(d) => d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            KeyValue::Month(m) => m.label(),
            KeyValue::State(s) | KeyValue::DistrictNorm(s) | KeyValue::District(s) => s.clone(),
            KeyValue::Pincode(p) => p.map(|p| p.to_string()).unwrap_or_default(),
        }
    }

    pub fn as_month(&self) -> Option<Month> {
        match self {
            KeyValue::Month(m) => Some(*m),
            _ => None,
        }
    }
}

/// Ordered key tuple; derives a total order from its values.
#[derive(Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct GroupKey(Vec<KeyValue>);

impl GroupKey {
    pub fn new(values: Vec<KeyValue>) -> Self { Self(values) }
    pub fn values(&self) -> &[KeyValue] { &self.0 }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn get(&self, field: KeyField) -> Option<&KeyValue> {
        self.0.iter().find(|v| v.field() == field)
    }

    pub fn fields(&self) -> Vec<KeyField> {
        self.0.iter().map(KeyValue::field).collect()
    }

    /// Human-readable `column=value` list for diagnostics.
    pub fn describe(&self) -> String {
        if self.0.is_empty() {
            return "(national)".to_string();
        }
        self.0
            .iter()
            .map(|v| format!("{}={}", v.field().column(), v.render()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Anything the generic aggregator can group.
pub trait Keyed {
    /// Value for `field`, or `None` if this record does not carry it.
    fn key_value(&self, field: KeyField) -> Option<KeyValue>;
    fn metrics(&self) -> &[u64];
}

impl<T: Keyed + ?Sized> Keyed for &T {
    fn key_value(&self, field: KeyField) -> Option<KeyValue> {
        (**self).key_value(field)
    }
    fn metrics(&self) -> &[u64] {
        (**self).metrics()
    }
}

/// One row of any table: a key plus metric counts aligned with the table's columns.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Row {
    pub key: GroupKey,
    pub metrics: Vec<u64>,
}

impl Keyed for Row {
    fn key_value(&self, field: KeyField) -> Option<KeyValue> {
        self.key.get(field).cloned()
    }
    fn metrics(&self) -> &[u64] {
        &self.metrics
    }
}

/// A keyed table with named metric columns.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Table {
    pub key_fields: Vec<KeyField>,
    pub metric_columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(key_fields: Vec<KeyField>, metric_columns: Vec<String>) -> Self {
        Self { key_fields, metric_columns, rows: Vec::new() }
    }

    pub fn len(&self) -> usize { self.rows.len() }
    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    /// Key columns followed by metric columns.
    pub fn header(&self) -> Vec<String> {
        self.key_fields
            .iter()
            .map(|f| f.column().to_string())
            .chain(self.metric_columns.iter().cloned())
            .collect()
    }

    /// Exact per-metric totals over all rows.
    pub fn metric_totals(&self) -> Result<Vec<u128>, CoreError> {
        metric_totals(&self.rows, self.metric_columns.len())
    }
}

/// Exact per-metric totals over any keyed records (u128 accumulation).
pub fn metric_totals<R: Keyed>(records: &[R], width: usize) -> Result<Vec<u128>, CoreError> {
    let mut totals = vec![0u128; width];
    for r in records {
        let m = r.metrics();
        if m.len() != width {
            return Err(CoreError::MetricWidthMismatch { expected: width, got: m.len() });
        }
        for (t, v) in totals.iter_mut().zip(m) {
            *t = t.checked_add(u128::from(*v)).ok_or(CoreError::MetricOverflow("metric_totals"))?;
        }
    }
    Ok(totals)
}
