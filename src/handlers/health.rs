use axum::response::IntoResponse;

use crate::middleware::ApiResponse;

/// GET /health - liveness only; touches no backing store.
pub async fn health() -> impl IntoResponse {
    ApiResponse::success(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
