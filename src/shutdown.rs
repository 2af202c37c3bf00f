use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::{
    signal,
    sync::{Mutex, watch},
    task::JoinHandle,
    time::timeout,
};
use tracing::{error, info};

use crate::cache::TieredCache;

/// Graceful shutdown coordinator
#[derive(Clone)]
pub struct ShutdownCoordinator {
    shutdown_requested: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            shutdown_requested: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Get a receiver for shutdown notifications
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Relaxed)
    }

    /// Broadcast shutdown to every subscriber; later calls are no-ops
    pub fn initiate_shutdown(&self) {
        if self
            .shutdown_requested
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok()
        {
            info!("Initiating graceful shutdown...");
            if let Err(e) = self.shutdown_tx.send(true) {
                error!("Failed to broadcast shutdown signal: {}", e);
            }
        }
    }

    /// Wait for SIGINT or SIGTERM, then initiate shutdown
    pub async fn wait_for_shutdown_signal(&self) {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received Ctrl+C signal");
            },
            _ = terminate => {
                info!("Received terminate signal");
            },
        }

        self.initiate_shutdown();
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Components that need cleanup after the HTTP server stops
#[async_trait::async_trait]
pub trait GracefulShutdown {
    fn name(&self) -> &str;

    async fn shutdown(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Runs registered components' shutdown in registration order, each bounded
/// by the same timeout
pub struct ShutdownManager {
    components: Vec<Box<dyn GracefulShutdown + Send + Sync>>,
    timeout_duration: Duration,
}

impl ShutdownManager {
    pub fn new(timeout_duration: Duration) -> Self {
        Self {
            components: Vec::new(),
            timeout_duration,
        }
    }

    pub fn register<T>(&mut self, component: T)
    where
        T: GracefulShutdown + Send + Sync + 'static,
    {
        self.components.push(Box::new(component));
    }

    pub fn register_background_task(&mut self, task: JoinHandle<()>, name: &str) {
        self.register(BackgroundTaskShutdown::new(name.to_string(), task));
    }

    pub async fn shutdown_all(&self) {
        info!("Shutting down {} components...", self.components.len());

        for component in &self.components {
            let component_name = component.name();

            match timeout(self.timeout_duration, component.shutdown()).await {
                Ok(Ok(())) => {
                    info!("Successfully shut down component: {}", component_name);
                }
                Ok(Err(e)) => {
                    error!("Error shutting down component {}: {}", component_name, e);
                }
                Err(_) => {
                    error!("Timeout shutting down component: {}", component_name);
                }
            }
        }

        info!("Shutdown complete");
    }
}

/// Drops the local cache tier. Entries in the remote tier keep their TTL.
pub struct CacheShutdown {
    cache: Arc<TieredCache>,
}

impl CacheShutdown {
    pub fn new(cache: Arc<TieredCache>) -> Self {
        Self { cache }
    }
}

#[async_trait::async_trait]
impl GracefulShutdown for CacheShutdown {
    fn name(&self) -> &str {
        "Cache"
    }

    async fn shutdown(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let entries = self.cache.local().len().await;
        self.cache.local().clear().await;
        info!(local_entries = entries, "Local cache tier released");
        Ok(())
    }
}

/// Aborts a background task and waits for it to unwind
pub struct BackgroundTaskShutdown {
    name: String,
    task_handle: Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundTaskShutdown {
    pub fn new(name: String, task_handle: JoinHandle<()>) -> Self {
        Self {
            name,
            task_handle: Mutex::new(Some(task_handle)),
        }
    }
}

#[async_trait::async_trait]
impl GracefulShutdown for BackgroundTaskShutdown {
    fn name(&self) -> &str {
        &self.name
    }

    async fn shutdown(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Some(handle) = self.task_handle.lock().await.take() {
            if handle.is_finished() {
                info!("Background task '{}' already finished", self.name);
            } else {
                info!("Shutting down background task: {}", self.name);
                handle.abort();
                // a cancelled JoinError is the expected outcome
                let _ = handle.await;
            }
        }
        Ok(())
    }
}
