//! Application startup and lifecycle management.

use crate::config::PlantConfig;
use crate::handlers;
use crate::services::analysis::gemini::{GeminiAnalysisProvider, GeminiConfig};
use crate::services::{AnalysisProvider, ReportRenderer, ScratchDir};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{make_request_span, request_id_middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Slack given to the HTTP client on top of the analysis deadline, so the
/// deadline is what the caller observes.
const CLIENT_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: PlantConfig,
    pub provider: Arc<dyn AnalysisProvider>,
    pub renderer: Arc<ReportRenderer>,
    pub uploads: ScratchDir,
    pub reports: ScratchDir,
}

impl AppState {
    pub fn new(config: PlantConfig, provider: Arc<dyn AnalysisProvider>) -> Self {
        Self {
            uploads: ScratchDir::new(&config.storage.uploads_dir),
            reports: ScratchDir::new(&config.storage.reports_dir),
            renderer: Arc::new(ReportRenderer::default()),
            provider,
            config,
        }
    }
}

/// Build the HTTP router for the given state.
pub fn router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.storage.static_dir);

    Router::new()
        .route("/analyze", post(handlers::analyze_image))
        .route("/download", post(handlers::download_report))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .fallback_service(static_files)
        .layer(DefaultBodyLimit::max(state.config.http.max_body_bytes))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the Gemini provider.
    pub async fn build(config: PlantConfig) -> Result<Self, AppError> {
        let provider = GeminiAnalysisProvider::new(GeminiConfig {
            api_key: config.gemini.api_key.clone(),
            model: config.gemini.model.clone(),
            api_base: config.gemini.api_base.clone(),
            request_timeout: config.analysis.timeout() + CLIENT_TIMEOUT_SLACK,
        })
        .map_err(|e| {
            tracing::error!("Failed to initialize Gemini provider: {}", e);
            AppError::ConfigError(anyhow::anyhow!(e))
        })?;

        tracing::info!(
            model = %provider.model(),
            "Initialized Gemini analysis provider"
        );

        Self::build_with_provider(config, Arc::new(provider)).await
    }

    /// Build the application around an existing provider.
    pub async fn build_with_provider(
        config: PlantConfig,
        provider: Arc<dyn AnalysisProvider>,
    ) -> Result<Self, AppError> {
        let state = AppState::new(config.clone(), provider);
        let router = router(state);

        // Port 0 = random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            port,
            uploads_dir = %config.storage.uploads_dir.display(),
            reports_dir = %config.storage.reports_dir.display(),
            "Plant service listening"
        );

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
