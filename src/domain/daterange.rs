use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::domain::{DomainError, DomainResult};

/// An inclusive day-granularity window.
///
/// Both bounds are normalized to UTC midnight, and every probe date is
/// truncated the same way, so time-of-day noise on either side never
/// affects membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

fn truncate_to_day(date: DateTime<Utc>) -> DateTime<Utc> {
    date.date_naive().and_time(NaiveTime::MIN).and_utc()
}

impl DateRange {
    /// An inverted range is a validation failure, not an empty result —
    /// the same guard exists at the request boundary.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<Self> {
        let start = truncate_to_day(start);
        let end = truncate_to_day(end);
        if start > end {
            return Err(DomainError::InvalidDateRange);
        }
        Ok(Self { start, end })
    }

    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> DomainResult<Self> {
        Self::new(
            start.and_time(NaiveTime::MIN).and_utc(),
            end.and_time(NaiveTime::MIN).and_utc(),
        )
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        let day = truncate_to_day(date);
        self.start <= day && day <= self.end
    }
}

/// Keep the items whose date falls inside the window.
pub fn filter_by_date_range<T, F>(items: Vec<T>, range: &DateRange, date_of: F) -> Vec<T>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    items
        .into_iter()
        .filter(|item| range.contains(date_of(item)))
        .collect()
}
