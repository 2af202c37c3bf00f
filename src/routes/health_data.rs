use crate::{
    error::AppError,
    models::{
        CreateHealthDataRequest, HealthDataListResponse, HealthDataQuery, HealthRecord,
        SummaryQuery,
    },
    routes::ApiErrorResponse,
    server::Server,
    summary::{DateRange, SummaryResult},
};
use axum::{
    Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::Json,
    routing::get,
};
use tracing::info;

/// Records per page of the listing endpoint
pub const PAGE_SIZE: usize = 50;

pub fn create_health_data_routes() -> Router<Server> {
    Router::new()
        .route(
            "/users/{user_id}/health-data",
            get(list_health_data).post(create_health_data),
        )
        .route("/users/{user_id}/summary", get(get_summary))
}

/// Store a health measurement for a user
#[utoipa::path(
    post,
    path = "/users/{user_id}/health-data",
    params(("user_id" = String, Path, description = "User identifier")),
    request_body = CreateHealthDataRequest,
    responses(
        (status = 201, description = "Record created", body = HealthRecord),
        (status = 401, description = "Missing or invalid API key", body = ApiErrorResponse),
        (status = 422, description = "Invalid or negative field", body = ApiErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ApiErrorResponse),
    ),
    security(("api_key" = [])),
    tag = "Health Data"
)]
pub async fn create_health_data(
    State(server): State<Server>,
    Path(user_id): Path<String>,
    payload: Result<Json<CreateHealthDataRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<HealthRecord>), AppError> {
    let Json(request) = payload?;
    let record = request.validate().map_err(AppError::Validation)?;

    let created = server.store.insert(&user_id, record).await?;
    info!(user_id = %user_id, record_id = %created.id, "Health record created");

    Ok((StatusCode::CREATED, Json(created)))
}

/// List a user's records in a date range, 50 per page
#[utoipa::path(
    get,
    path = "/users/{user_id}/health-data",
    params(
        ("user_id" = String, Path, description = "User identifier"),
        HealthDataQuery,
    ),
    responses(
        (status = 200, description = "One page of records", body = HealthDataListResponse),
        (status = 400, description = "Malformed date", body = ApiErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = ApiErrorResponse),
        (status = 422, description = "Missing parameter or page below 1", body = ApiErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ApiErrorResponse),
    ),
    security(("api_key" = [])),
    tag = "Health Data"
)]
pub async fn list_health_data(
    State(server): State<Server>,
    Path(user_id): Path<String>,
    query: Result<Query<HealthDataQuery>, QueryRejection>,
) -> Result<Json<HealthDataListResponse>, AppError> {
    let Query(params) = query?;
    let page = u64::try_from(params.page)
        .ok()
        .filter(|page| *page >= 1)
        .ok_or_else(|| {
            AppError::Validation(format!("page must be greater than or equal to 1, got {}", params.page))
        })?;

    let range = DateRange::parse(&params.start, &params.end)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let records = server
        .summary_service
        .aggregator()
        .fetch(&user_id, &range)
        .await?;

    Ok(Json(paginate(records, page)))
}

/// Cached aggregate over a user's records in a date range
#[utoipa::path(
    get,
    path = "/users/{user_id}/summary",
    params(
        ("user_id" = String, Path, description = "User identifier"),
        SummaryQuery,
    ),
    responses(
        (status = 200, description = "Summary for the range", body = SummaryResult),
        (status = 400, description = "Malformed date", body = ApiErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = ApiErrorResponse),
        (status = 422, description = "Missing parameter", body = ApiErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ApiErrorResponse),
    ),
    security(("api_key" = [])),
    tag = "Health Data"
)]
pub async fn get_summary(
    State(server): State<Server>,
    Path(user_id): Path<String>,
    query: Result<Query<SummaryQuery>, QueryRejection>,
) -> Result<Json<SummaryResult>, AppError> {
    let Query(params) = query?;

    let summary = server
        .summary_service
        .get_summary(&user_id, &params.start, &params.end)
        .await?;

    Ok(Json(summary))
}

/// Order by timestamp and cut page `page` (1-based) out of `records`
fn paginate(mut records: Vec<HealthRecord>, page: u64) -> HealthDataListResponse {
    records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));

    let total_count = records.len();
    let start_index = usize::try_from(page.saturating_sub(1))
        .unwrap_or(usize::MAX)
        .saturating_mul(PAGE_SIZE);
    let end_index = start_index.saturating_add(PAGE_SIZE);

    let data = records
        .into_iter()
        .skip(start_index)
        .take(PAGE_SIZE)
        .collect();

    HealthDataListResponse {
        data,
        page,
        total_count: total_count as u64,
        has_more: end_index < total_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    fn records(count: usize) -> Vec<HealthRecord> {
        let base: DateTime<Utc> = "2026-01-08T00:00:00Z".parse().unwrap();
        (0..count)
            .rev()
            .map(|i| HealthRecord {
                id: format!("id-{i:03}"),
                user_id: "user123".to_string(),
                timestamp: base + Duration::minutes(i as i64),
                steps: i as u64,
                calories: 0,
                sleep_hours: 0.0,
            })
            .collect()
    }

    #[test]
    fn test_single_page() {
        let page = paginate(records(2), 1);
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.total_count, 2);
        assert!(!page.has_more);
        assert_eq!(page.page, 1);
    }

    #[test]
    fn test_pages_are_ordered_by_timestamp() {
        let first = paginate(records(120), 1);
        assert_eq!(first.data.len(), PAGE_SIZE);
        assert!(first.has_more);
        assert_eq!(first.data[0].steps, 0);
        assert_eq!(first.data[49].steps, 49);

        let third = paginate(records(120), 3);
        assert_eq!(third.data.len(), 20);
        assert!(!third.has_more);
        assert_eq!(third.data[0].steps, 100);
    }

    #[test]
    fn test_exact_page_boundary_has_no_more() {
        let page = paginate(records(50), 1);
        assert_eq!(page.data.len(), 50);
        assert!(!page.has_more);
    }

    #[test]
    fn test_page_past_end_is_empty() {
        let page = paginate(records(3), 5);
        assert!(page.data.is_empty());
        assert_eq!(page.total_count, 3);
        assert!(!page.has_more);
    }
}
