use axum::response::Response;

use crate::response;

pub const HEALTH_MSG: &str = "Interview Tracker API is running";

/// Liveness probe; does not touch the database.
pub async fn health() -> Response {
    response::ok(
        HEALTH_MSG,
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now(),
        }),
    )
}

/// Catch-all for unknown routes.
pub async fn not_found() -> crate::error::ApiError {
    crate::error::ApiError::NotFound("Endpoint not found.".to_string())
}
