mod common;

use axum::http::StatusCode;
use common::{noisy_png, wait_until_empty, ParsedPdf, TestApp};
use plant_service::services::analysis::mock::MockAnalysisProvider;
use plant_service::services::data_uri;
use serde_json::json;
use std::sync::Arc;

async fn spawn_app() -> TestApp {
    TestApp::spawn_with(Arc::new(MockAnalysisProvider::fixed("unused"))).await
}

#[tokio::test]
async fn download_with_image_returns_pdf_attachment() {
    let app = spawn_app().await;
    let image = data_uri::encode("image/png", &noisy_png(64, 64, 7));

    let response = app
        .post_report(json!({ "result": "A healthy Monstera deliciosa.", "image": image }))
        .await;

    assert_eq!(StatusCode::OK, response.status());
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/pdf"
    );
    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"Plant_Analysis_Report_"));
    assert!(disposition.ends_with(".pdf\""));

    let pdf = ParsedPdf::parse(&response.bytes().await.unwrap());
    assert_eq!(pdf.page_count(), 1);
    let text = pdf.page_text(1);
    assert!(text.contains("Plant Analysis Report"));
    assert!(text.contains("Date: "));
    assert!(text.contains("A healthy Monstera deliciosa."));
    assert_eq!(pdf.image_count(), 1);

    assert!(wait_until_empty(app.reports_dir()).await);
}

#[tokio::test]
async fn download_without_image_has_text_and_no_image() {
    let app = spawn_app().await;

    let response = app
        .post_report(json!({ "result": "Pothos with variegated leaves." }))
        .await;

    assert_eq!(StatusCode::OK, response.status());
    let pdf = ParsedPdf::parse(&response.bytes().await.unwrap());
    assert!(pdf.page_count() >= 1);
    assert!(pdf.page_text(1).contains("Pothos with variegated leaves."));
    assert_eq!(pdf.image_count(), 0);

    assert!(wait_until_empty(app.reports_dir()).await);
}

#[tokio::test]
async fn download_omits_malformed_image() {
    let app = spawn_app().await;

    for image in [
        "data:image/png;base64,this is not an image".to_string(),
        data_uri::encode("image/png", b"plain text, not a png"),
    ] {
        let response = app
            .post_report(json!({ "result": "Leaves show mild chlorosis.", "image": image }))
            .await;

        assert_eq!(StatusCode::OK, response.status());
        let pdf = ParsedPdf::parse(&response.bytes().await.unwrap());
        assert!(pdf.page_text(1).contains("Leaves show mild chlorosis."));
        assert_eq!(pdf.image_count(), 0);
    }

    assert!(wait_until_empty(app.reports_dir()).await);
}

#[tokio::test]
async fn download_paginates_long_analysis() {
    let app = spawn_app().await;
    let mut text = "The plant is a Ficus lyrata with broad, violin-shaped leaves. ".repeat(600);
    text.push_str("FINALSENTENCE");

    let response = app.post_report(json!({ "result": text })).await;

    assert_eq!(StatusCode::OK, response.status());
    let pdf = ParsedPdf::parse(&response.bytes().await.unwrap());
    assert!(pdf.page_count() > 1, "expected several pages");
    assert!(pdf.page_text(1).contains("Ficus"));
    assert!(pdf.text().contains("FINALSENTENCE"));
    let last = pdf.page_count() as u32;
    assert!(pdf.page_text(last).contains("FINALSENTENCE"));

    assert!(wait_until_empty(app.reports_dir()).await);
}

#[tokio::test]
async fn download_rejects_body_without_result() {
    let app = spawn_app().await;

    let response = app
        .post_report(json!({ "image": "data:image/png;base64," }))
        .await;

    assert!(response.status().is_client_error());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid report request");
    assert!(common::files_in(app.reports_dir()).is_empty());
}

#[tokio::test]
async fn download_rejects_malformed_json_with_error_body() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(format!("{}/download", app.address))
        .header("content-type", "application/json")
        .body("{not json}")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::BAD_REQUEST, response.status());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid report request");
}

#[tokio::test]
async fn concurrent_downloads_clean_up_every_report() {
    let app = Arc::new(spawn_app().await);

    let tasks: Vec<_> = (0..10)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                let response = app
                    .post_report(json!({ "result": format!("Report number {}", i) }))
                    .await;
                assert_eq!(StatusCode::OK, response.status());
                (i, response.bytes().await.unwrap())
            })
        })
        .collect();

    for task in tasks {
        let (i, bytes) = task.await.expect("request task panicked");
        let pdf = ParsedPdf::parse(&bytes);
        assert!(pdf.page_text(1).contains(&format!("Report number {}", i)));
    }

    assert!(wait_until_empty(app.reports_dir()).await);
}
