use crate::{error::AppError, server::Server};
use axum::{Router, http::header, routing::get};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Health Metrics API",
        version = "1.0.0",
        description = "Ingest and summarize per-user health metrics (steps, calories, sleep)"
    ),
    paths(
        crate::routes::health::health_check,
        crate::routes::health::component_health,
        crate::routes::health_data::create_health_data,
        crate::routes::health_data::list_health_data,
        crate::routes::health_data::get_summary,
    ),
    components(
        schemas(
            crate::routes::ApiErrorResponse,
            crate::routes::health::HealthCheckQuery,
            crate::health::ComponentHealthResponse,
            crate::health::HealthStatus,
            crate::health::HealthCheckResult,
            crate::models::HealthCheck,
            crate::models::HealthRecord,
            crate::models::CreateHealthDataRequest,
            crate::models::HealthDataListResponse,
            crate::summary::SummaryResult,
        )
    ),
    tags(
        (name = "Health", description = "Liveness and component health"),
        (name = "Health Data", description = "Health record ingestion, listing and summaries"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_key",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-KEY"))),
        );
    }
}

/// Swagger UI at `/docs`, the document at `/api-docs/openapi.json` and
/// `/api-docs/openapi.yaml`
pub fn create_docs_routes() -> Router<Server> {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api-docs/openapi.yaml", get(openapi_yaml))
}

async fn openapi_yaml() -> Result<([(header::HeaderName, &'static str); 1], String), AppError> {
    let spec = ApiDoc::openapi();
    let yaml = serde_yaml_ng::to_string(&spec).map_err(|e| {
        AppError::Internal(format!("Failed to serialize OpenAPI spec to YAML: {e}"))
    })?;

    Ok(([(header::CONTENT_TYPE, "application/yaml")], yaml))
}
