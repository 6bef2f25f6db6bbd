use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use service_core::error::AppError;

/// Health check endpoint for Docker/K8s liveness probes.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "plant-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness check endpoint: ready once the analysis provider answers.
pub async fn readiness_check(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.provider.health_check().await.map_err(|e| {
        tracing::warn!(error = %e, "Analysis provider not ready");
        AppError::ServiceUnavailable
    })?;

    Ok(StatusCode::OK)
}
