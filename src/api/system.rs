//! Welcome, health and fallback handlers.

use axum::Json;
use axum::response::IntoResponse;
use chrono::Utc;
use serde_json::json;

use crate::api::ApiError;
use crate::services::ServiceError;

/// `GET /`
pub async fn welcome() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "message": "Vuot Vu Mon - Quiz Platform API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": { "health": "/health", "api": "/api/*" },
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "OK",
        "message": "Server is running",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Any unmatched route.
pub async fn not_found() -> ApiError {
    ServiceError::not_found("Endpoint not found").into()
}
