use crate::{
    auth::api_key_middleware, middleware::RequestIdExt, rate_limit::rate_limit_middleware,
    server::Server,
};
use axum::{
    Router,
    extract::{ConnectInfo, Request},
    middleware::{self, Next},
    response::Response,
};
use std::net::SocketAddr;
use tracing::info;

/// Helpers for attaching the common middleware stacks to route groups
pub struct RouteHelpers;

impl RouteHelpers {
    /// API key check, then per-IP rate limiting. Layers run outermost
    /// first, so the auth layer is added last.
    pub fn protected(routes: Router<Server>, server: &Server) -> Router<Server> {
        let mut routes = routes;
        if server.rate_limiter.enabled() {
            routes = routes.route_layer(middleware::from_fn_with_state(
                server.clone(),
                rate_limit_middleware,
            ));
        }
        routes.route_layer(middleware::from_fn_with_state(
            server.clone(),
            api_key_middleware,
        ))
    }
}

/// Structured request/response logging for API routes
pub async fn request_response_logger(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let request_id = req.extensions().request_id();

    let is_api_route = path.starts_with("/users") || path.starts_with("/health");
    if !is_api_route {
        return next.run(req).await;
    }

    let ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|connect_info| connect_info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    info!(
        method = %method,
        path = %path,
        ip = %ip,
        request_id = %request_id,
        "API request"
    );

    let start = std::time::Instant::now();
    let response = next.run(req).await;
    let duration = start.elapsed();

    info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        latency_ms = %duration.as_millis(),
        request_id = %request_id,
        "API response"
    );

    response
}
