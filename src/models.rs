//! Request and response types shared by the store and the HTTP layer

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

/// A stored health measurement. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthRecord {
    /// Store-generated identifier
    pub id: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub steps: u64,
    pub calories: u64,
    pub sleep_hours: f64,
}

/// A validated measurement ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct NewHealthRecord {
    pub timestamp: DateTime<Utc>,
    pub steps: u64,
    pub calories: u64,
    pub sleep_hours: f64,
}

impl NewHealthRecord {
    pub fn into_record(self, id: String, user_id: &str) -> HealthRecord {
        HealthRecord {
            id,
            user_id: user_id.to_string(),
            timestamp: self.timestamp,
            steps: self.steps,
            calories: self.calories,
            sleep_hours: self.sleep_hours,
        }
    }
}

/// Body of `POST /users/{user_id}/health-data`
///
/// Metrics are accepted as signed values so negative input is reported as a
/// validation failure naming the field.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateHealthDataRequest {
    /// ISO 8601 date-time; without an offset it is taken as UTC
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[schema(minimum = 0)]
    pub steps: i64,
    #[schema(minimum = 0)]
    pub calories: i64,
    #[schema(minimum = 0)]
    pub sleep_hours: f64,
}

const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an RFC 3339 timestamp, or an offset-less one as UTC
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid timestamp: {raw}, expected an ISO 8601 date-time"))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

impl CreateHealthDataRequest {
    pub fn validate(self) -> Result<NewHealthRecord, String> {
        let steps = u64::try_from(self.steps)
            .map_err(|_| format!("steps must be greater than or equal to 0, got {}", self.steps))?;
        let calories = u64::try_from(self.calories).map_err(|_| {
            format!("calories must be greater than or equal to 0, got {}", self.calories)
        })?;
        if !self.sleep_hours.is_finite() || self.sleep_hours < 0.0 {
            return Err(format!(
                "sleepHours must be greater than or equal to 0, got {}",
                self.sleep_hours
            ));
        }

        Ok(NewHealthRecord {
            timestamp: self.timestamp,
            steps,
            calories,
            sleep_hours: self.sleep_hours,
        })
    }
}

/// Query for the listing endpoint
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HealthDataQuery {
    /// Start date in DD-MM-YYYY format
    pub start: String,
    /// End date in DD-MM-YYYY format
    pub end: String,
    /// Page number, starting at 1
    #[serde(default = "default_page")]
    #[param(minimum = 1)]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

/// Query for the summary endpoint
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SummaryQuery {
    /// Start date in DD-MM-YYYY format
    pub start: String,
    /// End date in DD-MM-YYYY format
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthDataListResponse {
    pub data: Vec<HealthRecord>,
    pub page: u64,
    pub total_count: u64,
    pub has_more: bool,
}

/// Liveness response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthCheck {
    pub status: String,
}
