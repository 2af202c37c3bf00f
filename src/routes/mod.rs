pub mod docs;
pub mod health;
pub mod health_data;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use docs::create_docs_routes;
pub use health::create_health_routes;
pub use health_data::create_health_data_routes;

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// Error category
    #[schema(example = "Bad request")]
    pub error: String,
    /// Human-readable detail
    #[schema(example = "Invalid date format: 2026-01-01. Expected DD-MM-YYYY")]
    pub message: String,
}
