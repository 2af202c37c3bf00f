use crate::error::AppError;
use crate::middleware::RequestIdExt;
use crate::server::Server;
use axum::{
    extract::{Request, State},
    http::HeaderName,
    middleware::Next,
    response::Response,
};
use tracing::{trace, warn};

/// Static header name for API key
pub static X_API_KEY: HeaderName = HeaderName::from_static("x-api-key");

/// Reject the request unless `X-API-KEY` matches the configured key exactly
pub async fn api_key_middleware(
    State(server): State<Server>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let request_id = request.extensions().request_id();

    let Some(header) = request.headers().get(&X_API_KEY) else {
        warn!(request_id = %request_id, "Missing API key");
        return Err(AppError::Unauthorized("Invalid or missing API key".to_string()));
    };

    if header.as_bytes() != server.config.auth.api_key.as_bytes() {
        warn!(request_id = %request_id, "Invalid API key");
        return Err(AppError::Unauthorized("Invalid or missing API key".to_string()));
    }

    trace!(request_id = %request_id, "API key accepted");
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestServerBuilder;
    use axum::{
        Router,
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
    };
    use tower::ServiceExt;

    async fn protected_app() -> Router {
        let server = TestServerBuilder::new().with_api_key("secret-key").build().await;
        Router::new()
            .route("/protected", get(|| async { "ok" }))
            .layer(from_fn_with_state(server.clone(), api_key_middleware))
            .with_state(server)
    }

    async fn status_for(key: Option<&str>) -> StatusCode {
        let mut builder = HttpRequest::builder().uri("/protected");
        if let Some(key) = key {
            builder = builder.header("X-API-KEY", key);
        }
        let request = builder.body(Body::empty()).unwrap();
        protected_app().await.oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_valid_key_passes() {
        assert_eq!(status_for(Some("secret-key")).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_key_rejected() {
        assert_eq!(status_for(None).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_wrong_key_rejected() {
        assert_eq!(status_for(Some("wrong")).await, StatusCode::UNAUTHORIZED);
        // exact match only
        assert_eq!(status_for(Some("secret-key ")).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(Some("SECRET-KEY")).await, StatusCode::UNAUTHORIZED);
    }
}
