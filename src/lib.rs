pub mod auth;
pub mod cache;
pub mod commands;
pub mod config;
pub mod error;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod store;
pub mod summary;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::Config;
pub use server::Server;
