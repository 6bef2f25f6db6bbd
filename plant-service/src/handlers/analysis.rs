use crate::dtos::AnalysisResponse;
use crate::error::PlantError;
use crate::services::data_uri;
use crate::services::{ScratchDir, ScratchFile};
use crate::startup::AppState;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use tokio::io::AsyncWriteExt;

/// Multipart field carrying the image.
pub const IMAGE_FIELD: &str = "image";

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// An image received from the client, parked in the uploads scratch dir.
pub struct UploadedImage {
    pub file: ScratchFile,
    pub mime_type: String,
}

/// `POST /analyze`: store the upload, run it through the analysis provider
/// and answer with the text plus the image as a data URI.
pub async fn analyze_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResponse>, PlantError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!(error = %e, "Request is not a multipart form");
        PlantError::MissingInput
    })?;

    let upload = receive_image(&state.uploads, &mut multipart).await?;
    let mime_type = upload.mime_type;

    let bytes = upload.file.read().await?;
    if let Err(e) = upload.file.release().await {
        tracing::warn!(error = %e, "Upload cleanup failed");
    }

    tracing::info!(
        mime_type = %mime_type,
        size = bytes.len(),
        "Image upload received"
    );

    let timeout = state.config.analysis.timeout();
    let results = tokio::time::timeout(timeout, state.provider.analyze(&bytes, &mime_type))
        .await
        .map_err(|_| PlantError::AnalysisTimeout(timeout))??;

    tracing::info!(
        mime_type = %mime_type,
        result_len = results.len(),
        "Image analysis completed"
    );

    Ok(Json(AnalysisResponse {
        results,
        image: data_uri::encode(&mime_type, &bytes),
    }))
}

/// Stream the `image` field into a scratch file. Other fields are skipped.
pub async fn receive_image(
    uploads: &ScratchDir,
    multipart: &mut Multipart,
) -> Result<UploadedImage, PlantError> {
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let mime_type = field
            .content_type()
            .unwrap_or(DEFAULT_MIME_TYPE)
            .to_string();

        let (file, mut writer) = uploads.create(None).await?;
        while let Some(chunk) = field.chunk().await? {
            writer.write_all(&chunk).await?;
        }
        writer.flush().await?;

        return Ok(UploadedImage { file, mime_type });
    }

    Err(PlantError::MissingInput)
}
