use crate::dtos::ReportRequest;
use crate::error::PlantError;
use crate::services::report::RenderError;
use crate::services::ReportContent;
use crate::startup::AppState;
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Local, Utc};

/// File name offered to the browser for a report generated now.
pub fn report_filename() -> String {
    format!(
        "Plant_Analysis_Report_{}.pdf",
        Utc::now().timestamp_millis()
    )
}

/// `POST /download`: render the analysis into a PDF and send it as an
/// attachment. The report's scratch file lives exactly as long as the
/// response body.
pub async fn download_report(
    State(state): State<AppState>,
    request: Result<Json<ReportRequest>, JsonRejection>,
) -> Result<Response, PlantError> {
    let Json(request) = request?;

    let content = ReportContent {
        text: request.result,
        image: request.image,
        date: Local::now().date_naive(),
    };

    let renderer = state.renderer.clone();
    let pdf = tokio::task::spawn_blocking(move || renderer.render(&content))
        .await
        .map_err(|e| RenderError::Task(e.to_string()))??;

    let report = state.reports.write(Some("pdf"), &pdf).await?;
    let filename = report_filename();

    tracing::info!(
        path = %report.path().display(),
        filename = %filename,
        size = pdf.len(),
        "PDF report generated"
    );

    let stream = report.into_stream().await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_LENGTH, pdf.len().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_carries_timestamp() {
        let name = report_filename();
        let stamp = name
            .strip_prefix("Plant_Analysis_Report_")
            .and_then(|rest| rest.strip_suffix(".pdf"))
            .expect("filename shape");
        assert!(stamp.parse::<i64>().is_ok());
    }
}
