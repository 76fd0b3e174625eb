use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, Utc};

/// A month/year bucket key, ordered chronologically (year before month).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthYear {
    pub year: i32,
    pub month: u32,
}

impl MonthYear {
    pub fn from_date(date: DateTime<Utc>) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for MonthYear {
    /// `3/2024` — 1-based month, no padding.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.month, self.year)
    }
}

/// What one row contributes to its bucket. The variant is decided by the
/// selected metric before rows reach the aggregator, so there is no
/// field-presence sniffing here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvolutionValue {
    /// Count-style metrics: each row is worth one.
    Count,
    /// Quantity sums carry the ordered quantity.
    Quantity(i64),
    /// Revenue sums carry quantity times unit price.
    Revenue(i64),
}

impl EvolutionValue {
    fn amount(self) -> i64 {
        match self {
            EvolutionValue::Count => 1,
            EvolutionValue::Quantity(value) | EvolutionValue::Revenue(value) => value,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EvolutionRow {
    pub period: MonthYear,
    pub value: EvolutionValue,
}

/// Sum rows into month/year buckets, ascending by (year, month).
pub fn aggregate(rows: &[EvolutionRow]) -> Vec<(MonthYear, i64)> {
    let mut buckets: BTreeMap<MonthYear, i64> = BTreeMap::new();
    for row in rows {
        *buckets.entry(row.period).or_insert(0) += row.value.amount();
    }
    buckets.into_iter().collect()
}
