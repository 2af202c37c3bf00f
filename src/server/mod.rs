pub mod config;
pub mod route_builder;

use crate::{
    cache::TieredCache,
    config::Config,
    error::AppError,
    health::HealthService,
    metrics,
    middleware::request_id_middleware,
    rate_limit::RateLimitService,
    routes::{create_docs_routes, create_health_data_routes, create_health_routes},
    server::route_builder::{RouteHelpers, request_response_logger},
    shutdown::{CacheShutdown, ShutdownCoordinator, ShutdownManager},
    store::{self, HealthStore, StoreHealthChecker},
    summary::SummaryService,
};
use axum::{Router, middleware};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing::{error, info};

/// How often idle rate-limit state is pruned
const RATE_LIMIT_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct Server {
    pub config: Arc<Config>,
    pub store: Arc<dyn HealthStore>,
    pub cache: Arc<TieredCache>,
    pub summary_service: Arc<SummaryService>,
    pub rate_limiter: Arc<RateLimitService>,
    pub health_service: Arc<HealthService>,
    pub shutdown_coordinator: Arc<ShutdownCoordinator>,
}

impl Server {
    pub async fn new(config: Config) -> Result<Self, AppError> {
        if config.metrics.enabled {
            if let Err(e) = metrics::init_metrics_with_port(config.metrics.port) {
                error!(
                    "Failed to start metrics server on port {}: {}",
                    config.metrics.port, e
                );
                return Err(AppError::Internal(format!(
                    "Failed to start metrics server: {}",
                    e
                )));
            }
        }

        let store = store::from_config(&config.store).await?;
        let cache = Arc::new(TieredCache::from_config(&config.cache));

        Ok(Self::with_components(config, store, cache).await)
    }

    /// Assemble a server around an existing store and cache
    pub async fn with_components(
        config: Config,
        store: Arc<dyn HealthStore>,
        cache: Arc<TieredCache>,
    ) -> Self {
        let summary_service = Arc::new(SummaryService::new(
            cache.clone(),
            store.clone(),
            config.cache.summary_ttl,
        ));
        let rate_limiter = Arc::new(RateLimitService::new(&config.rate_limit));

        let health_service = Arc::new(HealthService::new());
        health_service
            .register(Arc::new(StoreHealthChecker::new(store.clone())))
            .await;
        health_service.register(cache.clone()).await;

        Self {
            config: Arc::new(config),
            store,
            cache,
            summary_service,
            rate_limiter,
            health_service,
            shutdown_coordinator: Arc::new(ShutdownCoordinator::new()),
        }
    }

    pub async fn run(&self) -> Result<(), AppError> {
        if self.config.store.migration_on_startup {
            info!("Running store migrations");
            self.store.migrate().await?;
            info!("Store migrations completed successfully");
        }

        let mut shutdown_manager = ShutdownManager::new(Duration::from_secs(30));

        let rate_limiter = self.rate_limiter.clone();
        let prune_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(RATE_LIMIT_PRUNE_INTERVAL);
            loop {
                interval.tick().await;
                rate_limiter.retain_recent();
            }
        });
        shutdown_manager.register_background_task(prune_task, "rate limit pruning");
        shutdown_manager.register(CacheShutdown::new(self.cache.clone()));

        let app = self.create_app();

        let addr: SocketAddr = format!("{}:{}", self.config.server.host, self.config.server.port)
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid listen address: {}", e)))?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to bind to address: {}", e)))?;

        info!("Server listening on http://{}", addr);

        let shutdown_coordinator = self.shutdown_coordinator.clone();
        tokio::spawn(async move {
            shutdown_coordinator.wait_for_shutdown_signal().await;
        });

        let mut shutdown_rx = self.shutdown_coordinator.subscribe();
        let result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
            info!("Graceful shutdown initiated");
        })
        .await;

        if let Err(e) = result {
            error!("Server error: {}", e);
        }

        shutdown_manager.shutdown_all().await;
        info!("Server shutdown complete");

        Ok(())
    }

    /// Creates an application router
    pub fn create_app(&self) -> Router {
        let app = Router::new()
            .merge(create_health_routes())
            .merge(RouteHelpers::protected(create_health_data_routes(), self))
            .merge(create_docs_routes())
            .with_state(self.clone());

        self.add_conditional_middleware(app)
    }

    fn add_conditional_middleware(&self, mut app: Router) -> Router {
        if self.config.metrics.enabled {
            app = app.layer(middleware::from_fn(metrics::metrics_middleware));
        }
        if self.config.logging.log_request {
            app = app.layer(middleware::from_fn(request_response_logger));
        }
        // outermost, so every other layer sees the id
        app.layer(middleware::from_fn(request_id_middleware))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestServerBuilder;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_check_without_api_key() {
        let server = TestServerBuilder::new().build().await;
        let app = server.create_app();

        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_users_routes_require_api_key() {
        let server = TestServerBuilder::new().build().await;
        let app = server.create_app();

        let request = Request::builder()
            .uri("/users/user123/summary?start=08-01-2026&end=08-01-2026")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let server = TestServerBuilder::new().build().await;
        let app = server.create_app();

        let request = Request::builder().uri("/nope").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_components_registered() {
        let server = TestServerBuilder::new().build().await;
        let mut names = server.health_service.registered().await;
        names.sort();
        assert_eq!(names, vec!["cache".to_string(), "store".to_string()]);
    }
}
