//! Date-range aggregation and the cached summary built on top of it

use thiserror::Error;

use crate::error::AppError;
use crate::store::StoreError;

pub mod aggregator;
pub mod service;

pub use aggregator::{Aggregate, DateRange, DateRangeAggregator, InvalidDate, parse_date};
pub use service::{SummaryResult, SummaryService, summary_cache_key};

#[derive(Error, Debug)]
pub enum SummaryError {
    #[error(transparent)]
    InvalidDate(#[from] InvalidDate),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<SummaryError> for AppError {
    fn from(err: SummaryError) -> Self {
        match err {
            SummaryError::InvalidDate(e) => AppError::BadRequest(e.to_string()),
            SummaryError::Store(e) => AppError::Store(e),
        }
    }
}
