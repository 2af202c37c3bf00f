//! Shared-secret authentication for the `/users` routes

pub mod config;
pub mod middleware;

pub use config::AuthConfig;
pub use middleware::{X_API_KEY, api_key_middleware};
