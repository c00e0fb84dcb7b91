//! Health check endpoint.

use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::AppState;

/// Liveness probe response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `ok` when the process is serving.
    pub status: &'static str,
    /// Service identifier for multi-service deployments.
    pub service: &'static str,
    /// Crate version baked in at compile time.
    pub version: &'static str,
}

/// GET /health - Liveness check; does not touch the database.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "splitnest",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Creates the health router.
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_reports_service_and_version() {
        let Json(body) = health_check().await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.service, "splitnest");
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
    }
}
