use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use thiserror::Error;

use crate::models::HealthRecord;
use crate::store::{HealthStore, StoreResult};

pub const DATE_FORMAT: &str = "%d-%m-%Y";

const END_OF_DAY: NaiveTime = match NaiveTime::from_hms_opt(23, 59, 59) {
    Some(time) => time,
    None => NaiveTime::MIN,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid date format: {0}. Expected DD-MM-YYYY")]
pub struct InvalidDate(pub String);

/// Parse a `DD-MM-YYYY` calendar day
pub fn parse_date(raw: &str) -> Result<NaiveDate, InvalidDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| InvalidDate(raw.to_string()))
}

/// Inclusive UTC instant range covering whole calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// `start` at 00:00:00 through `end` at 23:59:59
    pub fn from_days(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: start.and_time(NaiveTime::MIN).and_utc(),
            end: end.and_time(END_OF_DAY).and_utc(),
        }
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, InvalidDate> {
        Ok(Self::from_days(parse_date(start)?, parse_date(end)?))
    }
}

/// Round half away from zero to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregate {
    pub count: usize,
    pub total_steps: u64,
    pub total_calories: u64,
    pub total_sleep_hours: f64,
}

impl Aggregate {
    pub fn from_records(records: &[HealthRecord]) -> Self {
        records.iter().fold(Self::default(), |mut acc, record| {
            acc.count += 1;
            acc.total_steps = acc.total_steps.saturating_add(record.steps);
            acc.total_calories = acc.total_calories.saturating_add(record.calories);
            acc.total_sleep_hours += record.sleep_hours;
            acc
        })
    }

    /// Mean calories rounded to 2 dp, 0.0 for an empty range
    pub fn average_calories(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        round2(self.total_calories as f64 / self.count as f64)
    }

    pub fn average_sleep_hours(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        round2(self.total_sleep_hours / self.count as f64)
    }
}

pub struct DateRangeAggregator {
    store: Arc<dyn HealthStore>,
}

impl DateRangeAggregator {
    pub fn new(store: Arc<dyn HealthStore>) -> Self {
        Self { store }
    }

    /// All of the user's records in the range, unordered
    pub async fn fetch(&self, user_id: &str, range: &DateRange) -> StoreResult<Vec<HealthRecord>> {
        self.store.find_in_range(user_id, range.start, range.end).await
    }

    pub async fn aggregate(&self, user_id: &str, range: &DateRange) -> StoreResult<Aggregate> {
        let records = self.fetch(user_id, range).await?;
        Ok(Aggregate::from_records(&records))
    }
}
