//! Calendar months and the configured month order.
//!
//! Time-series outputs never sort month labels as strings: "April" < "March"
//! alphabetically. `Month` orders chronologically, and `MonthDomain` carries the
//! explicit order every gridded output follows.

use core::fmt;
use core::str::FromStr;
use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};

use crate::errors::CoreError;

/// A calendar month. `Ord` is chronological (year, then month).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Result<Self, CoreError> {
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(CoreError::InvalidMonth(format!("{year}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(d: NaiveDate) -> Self {
        Self { year: d.year(), month: d.month() }
    }

    pub fn year(&self) -> i32 { self.year }
    pub fn month(&self) -> u32 { self.month }

    fn first_day(&self) -> NaiveDate {
        // Constructors guarantee a valid (year, month).
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    /// Label as used by the monthly feeds, e.g. `March 2025`.
    pub fn label(&self) -> String {
        self.first_day().format("%B %Y").to_string()
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl FromStr for Month {
    type Err = CoreError;

    /// Accepts `March 2025` (any case, abbreviations allowed) or `2025-03`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        if t.is_empty() {
            return Err(CoreError::InvalidMonth(s.to_string()));
        }
        if let Ok(d) = NaiveDate::parse_from_str(&format!("1 {t}"), "%d %B %Y") {
            return Ok(Self::from_date(d));
        }
        if let Ok(d) = NaiveDate::parse_from_str(&format!("{t}-01"), "%Y-%m-%d") {
            return Ok(Self::from_date(d));
        }
        Err(CoreError::InvalidMonth(s.to_string()))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Month {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.label())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Month {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Ordered list of valid calendar periods.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Vec<Month>", into = "Vec<Month>"))]
pub struct MonthDomain {
    months: Vec<Month>,
}

impl MonthDomain {
    /// Explicit order as configured. Duplicates are rejected.
    pub fn new(months: Vec<Month>) -> Result<Self, CoreError> {
        let mut seen = BTreeSet::new();
        for m in &months {
            if !seen.insert(*m) {
                return Err(CoreError::DuplicateMonth(m.label()));
            }
        }
        Ok(Self { months })
    }

    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Result<Self, CoreError> {
        let months = labels
            .iter()
            .map(|l| l.as_ref().parse::<Month>())
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(months)
    }

    /// Chronological domain of the months actually observed.
    pub fn observed<I: IntoIterator<Item = Month>>(it: I) -> Self {
        let set: BTreeSet<Month> = it.into_iter().collect();
        Self { months: set.into_iter().collect() }
    }

    pub fn months(&self) -> &[Month] { &self.months }
    pub fn len(&self) -> usize { self.months.len() }
    pub fn is_empty(&self) -> bool { self.months.is_empty() }

    pub fn contains(&self, m: &Month) -> bool {
        self.months.contains(m)
    }

    pub fn position(&self, m: &Month) -> Option<usize> {
        self.months.iter().position(|x| x == m)
    }

    /// Sort raw month labels by this domain's order. Labels that do not parse or
    /// are absent from the domain go last, keeping their relative order.
    pub fn sort_labels(&self, labels: &mut [String]) {
        labels.sort_by_key(|l| {
            l.parse::<Month>()
                .ok()
                .and_then(|m| self.position(&m))
                .unwrap_or(usize::MAX)
        });
    }
}

impl TryFrom<Vec<Month>> for MonthDomain {
    type Error = CoreError;
    fn try_from(v: Vec<Month>) -> Result<Self, Self::Error> {
        Self::new(v)
    }
}

impl From<MonthDomain> for Vec<Month> {
    fn from(d: MonthDomain) -> Self {
        d.months
    }
}
