//! Test helpers for plant-service integration tests.
//!
//! Each `TestApp` runs on a random port with its own scratch directories.

#![allow(dead_code)]

use plant_service::config::{
    AnalysisSettings, GeminiSettings, HttpConfig, PlantConfig, StorageConfig,
};
use plant_service::services::AnalysisProvider;
use plant_service::startup::Application;
use printpdf::lopdf;
use reqwest::multipart;
use service_core::config::Config as CoreConfig;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub config: PlantConfig,
    pub client: reqwest::Client,
    _root: TempDir,
}

/// Config pointing every directory into `root`.
pub fn test_config(root: &Path) -> PlantConfig {
    PlantConfig {
        common: CoreConfig { port: 0 },
        gemini: GeminiSettings {
            api_key: "test-api-key".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_base: "http://127.0.0.1:9".to_string(),
        },
        analysis: AnalysisSettings { timeout_secs: 30 },
        storage: StorageConfig {
            uploads_dir: root.join("uploads"),
            reports_dir: root.join("reports"),
            static_dir: root.join("public"),
        },
        http: HttpConfig {
            max_body_bytes: 10 * 1024 * 1024,
        },
    }
}

impl TestApp {
    pub async fn spawn_with(provider: Arc<dyn AnalysisProvider>) -> Self {
        Self::spawn_configured(provider, |_| {}).await
    }

    pub async fn spawn_configured(
        provider: Arc<dyn AnalysisProvider>,
        customize: impl FnOnce(&mut PlantConfig),
    ) -> Self {
        let root = tempfile::tempdir().expect("Failed to create temp dir");
        let mut config = test_config(root.path());
        customize(&mut config);

        let app = Application::build_with_provider(config.clone(), provider)
            .await
            .expect("Failed to build test application");
        Self::start(app, config, root).await
    }

    /// Start an already built application.
    pub async fn start(app: Application, config: PlantConfig, root: TempDir) -> Self {
        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            config,
            client,
            _root: root,
        }
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.config.storage.uploads_dir
    }

    pub fn reports_dir(&self) -> &Path {
        &self.config.storage.reports_dir
    }

    pub async fn post_image(&self, bytes: Vec<u8>, mime_type: &str) -> reqwest::Response {
        let form = multipart::Form::new().part(
            "image",
            multipart::Part::bytes(bytes)
                .file_name("plant.png")
                .mime_str(mime_type)
                .unwrap(),
        );

        self.client
            .post(format!("{}/analyze", self.address))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_report(&self, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}/download", self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// Files currently present in `dir` (none if the directory does not exist).
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    }
}

/// Poll until `dir` holds no files. Deletion after a streamed response can
/// trail the last byte slightly.
pub async fn wait_until_empty(dir: &Path) -> bool {
    for _ in 0..40 {
        if files_in(dir).is_empty() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    files_in(dir).is_empty()
}

/// PNG whose pixels come from a small LCG, so it does not compress away.
pub fn noisy_png(width: u32, height: u32, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    let img = image::RgbImage::from_fn(width, height, |_, _| {
        let mut next = || {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (state >> 16) as u8
        };
        image::Rgb([next(), next(), next()])
    });

    let mut bytes = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut bytes, image::ImageOutputFormat::Png)
        .unwrap();
    bytes.into_inner()
}

/// A rendered report, parsed back for inspection.
pub struct ParsedPdf {
    document: lopdf::Document,
}

impl ParsedPdf {
    pub fn parse(bytes: &[u8]) -> Self {
        assert!(bytes.starts_with(b"%PDF-"), "missing PDF header");
        let document = lopdf::Document::load_mem(bytes).expect("response is not a readable PDF");
        Self { document }
    }

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Text of every page, in page order.
    pub fn text(&self) -> String {
        let pages: Vec<u32> = self.document.get_pages().keys().copied().collect();
        self.document
            .extract_text(&pages)
            .expect("Failed to extract PDF text")
    }

    pub fn page_text(&self, page: u32) -> String {
        self.document
            .extract_text(&[page])
            .expect("Failed to extract PDF text")
    }

    /// Number of embedded image XObjects.
    pub fn image_count(&self) -> usize {
        self.document
            .objects
            .values()
            .filter(|object| match object {
                lopdf::Object::Stream(stream) => {
                    stream.dict.get(b"Subtype").and_then(|o| o.as_name()).ok()
                        == Some(&b"Image"[..])
                }
                _ => false,
            })
            .count()
    }
}
