//! Request-level error taxonomy for the plant endpoints.

use crate::services::analysis::ProviderError;
use crate::services::report::RenderError;
use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use service_core::error::ErrorResponse;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlantError {
    #[error("No image file was uploaded")]
    MissingInput,

    #[error("Failed to read multipart upload: {0}")]
    Upload(#[from] MultipartError),

    #[error("Invalid report request: {0}")]
    InvalidReport(#[from] JsonRejection),

    #[error("Analysis failed: {0}")]
    AnalysisFailed(#[from] ProviderError),

    #[error("Analysis timed out after {0:?}")]
    AnalysisTimeout(Duration),

    #[error("Report rendering failed: {0}")]
    RenderFailed(#[from] RenderError),

    #[error("Failed to remove scratch file {}: {source}", path.display())]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlantError {
    pub fn status(&self) -> StatusCode {
        match self {
            PlantError::MissingInput => StatusCode::BAD_REQUEST,
            PlantError::Upload(err) => err.status(),
            PlantError::InvalidReport(rejection) => rejection.status(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand back to the client.
    pub fn public_message(&self) -> &'static str {
        match self {
            PlantError::MissingInput => "Please upload an image",
            PlantError::Upload(_) => "Failed to read uploaded image",
            PlantError::InvalidReport(_) => "Invalid report request",
            PlantError::AnalysisFailed(_) | PlantError::AnalysisTimeout(_) => {
                "Failed to analyze image"
            }
            PlantError::RenderFailed(_) => "Error generating PDF report",
            PlantError::CleanupFailed { .. } | PlantError::Io(_) => "Internal server error",
        }
    }
}

impl IntoResponse for PlantError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "Request failed");
        } else {
            tracing::warn!(error = %self, status = %status, "Request rejected");
        }

        (status, Json(ErrorResponse::new(self.public_message()))).into_response()
    }
}
