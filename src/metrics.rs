use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    middleware::Next,
    response::Response,
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::time::Instant;
use tracing::info;

/// Install the Prometheus recorder and its scrape listener on `port`
pub fn init_metrics_with_port(port: u16) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .add_global_label("service", env!("CARGO_PKG_NAME"))
        .install()?;

    info!("Metrics server started on :{}/metrics", port);
    Ok(())
}

/// Middleware to collect HTTP request metrics
pub async fn metrics_middleware(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    gauge!("http_requests_active").increment(1.0);

    let response = next.run(req).await;

    let status = response.status();
    counter!("http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status.as_u16().to_string()
    )
    .increment(1);
    histogram!("http_request_duration_seconds",
        "method" => method.clone(),
        "path" => path.clone()
    )
    .record(start.elapsed().as_secs_f64());

    gauge!("http_requests_active").decrement(1.0);

    if status.is_server_error() {
        counter!("http_errors_total", "method" => method, "path" => path).increment(1);
    }

    response
}

/// Track a cache lookup against one tier
pub fn track_cache_lookup(tier: &'static str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("cache_lookups_total", "tier" => tier, "result" => result).increment(1);
}

/// Track a summary computed from the store (a read-through miss)
pub fn track_summary_computed(record_count: usize) {
    counter!("summary_computations_total").increment(1);
    histogram!("summary_records_aggregated").record(record_count as f64);
}

/// Track a request rejected by the rate limiter
pub fn track_rate_limit_rejection() {
    counter!("rate_limit_exceeded_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, http::StatusCode, routing::get};
    use tower::ServiceExt;

    #[test]
    fn test_tracking_without_recorder_is_noop() {
        track_cache_lookup("local", true);
        track_cache_lookup("remote", false);
        track_summary_computed(2);
        track_rate_limit_rejection();
    }

    #[tokio::test]
    async fn test_metrics_middleware_passes_response_through() {
        let app = Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(axum::middleware::from_fn(metrics_middleware));

        let request = Request::builder().uri("/ping").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
