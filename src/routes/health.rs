use crate::{
    health::ComponentHealthResponse,
    models::HealthCheck,
    server::Server,
};
use axum::{
    Router,
    extract::{Query, State},
    response::Json,
    routing::get,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HealthCheckQuery {
    /// Component to check: `store`, `cache` or `all`
    #[serde(default)]
    pub check: Option<String>,
}

/// Liveness and component health routes. Not authenticated.
pub fn create_health_routes() -> Router<Server> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/components", get(component_health))
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthCheck),
    ),
    tag = "Health"
)]
pub async fn health_check() -> Json<HealthCheck> {
    Json(HealthCheck {
        status: "ok".to_string(),
    })
}

/// Run the registered component checks
#[utoipa::path(
    get,
    path = "/health/components",
    params(HealthCheckQuery),
    responses(
        (status = 200, description = "Component health report", body = ComponentHealthResponse),
    ),
    tag = "Health"
)]
pub async fn component_health(
    State(server): State<Server>,
    Query(params): Query<HealthCheckQuery>,
) -> Json<ComponentHealthResponse> {
    let filter = params.check.as_deref();
    Json(server.health_service.check_components(filter).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestServerBuilder;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let server = TestServerBuilder::new().build().await;
        let app = create_health_routes().with_state(server);

        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_check() {
        let (status, body) = get_json("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_component_health_all() {
        let (status, body) = get_json("/health/components?check=all").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert!(body["checks"]["store"].is_object());
        assert!(body["checks"]["cache"].is_object());
    }

    #[tokio::test]
    async fn test_component_health_filtered() {
        let (status, body) = get_json("/health/components?check=cache").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["checks"]["cache"].is_object());
        assert!(body["checks"].get("store").is_none());
    }
}
