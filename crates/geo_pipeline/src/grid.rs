//! GRID stage: complete a month × region cross-product, zero-filling absent cells.
//!
//! Output order is the configured month order, then region order. Aggregated
//! rows that fall outside the grid are a defect, never silently dropped.

use std::collections::{BTreeMap, BTreeSet};

use geo_core::{GroupKey, KeyField, KeyValue, MonthDomain, NormalizedKey, Row, Table};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("table keys [{found}] do not match grid keys [{expected}]")]
    KeyShape { found: String, expected: String },

    #[error("aggregated row ({key}) falls outside the grid domain")]
    OutsideDomain { key: String },
}

/// The region axis of a grid: which key fields identify a region, and the
/// distinct regions (ascending).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RegionDomain {
    fields: Vec<KeyField>,
    regions: BTreeSet<Vec<KeyValue>>,
}

impl RegionDomain {
    /// The single, key-less national region.
    pub fn national() -> Self {
        Self { fields: Vec::new(), regions: BTreeSet::from([Vec::new()]) }
    }

    pub fn states<I, S>(states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: vec![KeyField::State],
            regions: states.into_iter().map(|s| vec![KeyValue::State(s.into())]).collect(),
        }
    }

    pub fn districts<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = &'a NormalizedKey>,
    {
        Self {
            fields: vec![KeyField::State, KeyField::District],
            regions: pairs
                .into_iter()
                .map(|p| vec![KeyValue::State(p.state.clone()), KeyValue::District(p.district.clone())])
                .collect(),
        }
    }

    /// Regions actually present in `table` (every key field except `Month`).
    pub fn observed(table: &Table) -> Self {
        let fields: Vec<KeyField> =
            table.key_fields.iter().copied().filter(|f| *f != KeyField::Month).collect();
        let regions = table
            .rows
            .iter()
            .map(|r| {
                r.key
                    .values()
                    .iter()
                    .filter(|v| v.field() != KeyField::Month)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        Self { fields, regions }
    }

    pub fn fields(&self) -> &[KeyField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

fn describe_fields(fields: &[KeyField]) -> String {
    fields.iter().map(|f| f.column()).collect::<Vec<_>>().join(", ")
}

/// Left-join `table` onto `months × regions`. `table` must be keyed by
/// `Month` followed by the region fields.
pub fn complete_grid(
    table: &Table,
    months: &MonthDomain,
    regions: &RegionDomain,
) -> Result<Table, GridError> {
    let mut expected = vec![KeyField::Month];
    expected.extend_from_slice(&regions.fields);
    if table.key_fields != expected {
        return Err(GridError::KeyShape {
            found: describe_fields(&table.key_fields),
            expected: describe_fields(&expected),
        });
    }

    let width = table.metric_columns.len();
    let mut present: BTreeMap<&GroupKey, &Vec<u64>> =
        table.rows.iter().map(|r| (&r.key, &r.metrics)).collect();

    let mut out = Table::new(expected, table.metric_columns.clone());
    out.rows.reserve(months.len() * regions.len());
    for &month in months.months() {
        for region in &regions.regions {
            let mut values = Vec::with_capacity(region.len() + 1);
            values.push(KeyValue::Month(month));
            values.extend(region.iter().cloned());
            let key = GroupKey::new(values);
            let metrics = present.remove(&key).cloned().unwrap_or_else(|| vec![0; width]);
            out.rows.push(Row { key, metrics });
        }
    }

    if let Some((key, _)) = present.into_iter().next() {
        return Err(GridError::OutsideDomain { key: key.describe() });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn state_row(month: &str, state: &str, v: u64) -> Row {
        Row {
            key: GroupKey::new(vec![
                KeyValue::Month(month.parse().unwrap()),
                KeyValue::State(state.into()),
            ]),
            metrics: vec![v],
        }
    }

    fn state_table(rows: Vec<Row>) -> Table {
        Table { key_fields: vec![KeyField::Month, KeyField::State], metric_columns: vec!["m".into()], rows }
    }

    #[test]
    fn fills_missing_cells_with_zero_in_configured_order() {
        let t = state_table(vec![state_row("April 2025", "goa", 4)]);
        let months = MonthDomain::from_labels(&["March 2025", "April 2025"]).unwrap();
        let regions = RegionDomain::states(["kerala", "goa"]);
        let g = complete_grid(&t, &months, &regions).unwrap();
        let rendered: Vec<String> = g
            .rows
            .iter()
            .map(|r| format!("{}={}", r.key.describe(), r.metrics[0]))
            .collect();
        assert_eq!(
            rendered,
            vec![
                "month=March 2025, state_norm=goa=0",
                "month=March 2025, state_norm=kerala=0",
                "month=April 2025, state_norm=goa=4",
                "month=April 2025, state_norm=kerala=0",
            ]
        );
    }

    #[test]
    fn rows_outside_domain_are_errors() {
        let t = state_table(vec![state_row("May 2025", "goa", 1)]);
        let months = MonthDomain::from_labels(&["March 2025"]).unwrap();
        let err = complete_grid(&t, &months, &RegionDomain::states(["goa"])).unwrap_err();
        assert!(matches!(err, GridError::OutsideDomain { .. }));
    }

    #[test]
    fn key_shape_must_match_region_fields() {
        let t = state_table(vec![]);
        let months = MonthDomain::from_labels(&["March 2025"]).unwrap();
        assert!(matches!(
            complete_grid(&t, &months, &RegionDomain::national()),
            Err(GridError::KeyShape { .. })
        ));
    }

    #[test]
    fn national_grid_has_one_row_per_month() {
        let t = Table { key_fields: vec![KeyField::Month], metric_columns: vec!["m".into()], rows: vec![] };
        let months = MonthDomain::from_labels(&["March 2025", "April 2025", "May 2025"]).unwrap();
        let g = complete_grid(&t, &months, &RegionDomain::national()).unwrap();
        assert_eq!(g.len(), 3);
        assert!(g.rows.iter().all(|r| r.metrics == vec![0]));
    }

    #[test]
    fn district_regions_from_master_pairs() {
        let pairs = vec![NormalizedKey::new("goa", "south goa"), NormalizedKey::new("goa", "north goa")];
        let d = RegionDomain::districts(&pairs);
        assert_eq!(d.len(), 2);
        assert_eq!(d.fields(), &[KeyField::State, KeyField::District]);
    }

    proptest! {
        #[test]
        fn grid_is_exactly_m_by_r(
            n_months in 1usize..6,
            states in proptest::collection::btree_set("[a-z]{1,6}", 1..6),
            picks in proptest::collection::vec((0usize..6, 0usize..6, 0u64..100), 0..20),
        ) {
            let months: Vec<String> = (1..=n_months).map(|m| format!("2025-{m:02}")).collect();
            let domain = MonthDomain::from_labels(months.as_slice()).unwrap();
            let states: Vec<String> = states.into_iter().collect();
            let mut cells: BTreeMap<(usize, usize), u64> = BTreeMap::new();
            for (m, s, v) in picks {
                cells.insert((m % n_months, s % states.len()), v);
            }
            let rows = cells
                .iter()
                .map(|(&(m, s), &v)| state_row(&months[m], &states[s], v))
                .collect();
            let t = state_table(rows);
            let g = complete_grid(&t, &domain, &RegionDomain::states(states.clone())).unwrap();
            prop_assert_eq!(g.len(), n_months * states.len());
            prop_assert_eq!(g.metric_totals().unwrap(), t.metric_totals().unwrap());
            let zeros = g.rows.iter().filter(|r| r.metrics[0] == 0).count();
            prop_assert!(zeros >= g.len() - t.len());
        }
    }
}
