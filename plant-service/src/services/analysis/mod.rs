//! Image analysis provider abstractions and implementations.
//!
//! Handlers only see [`AnalysisProvider`]; the Gemini client is wired in at
//! startup and tests substitute the mock.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

/// Instruction sent alongside every image.
pub const PLANT_ANALYSIS_PROMPT: &str = "Analyze this plant image and provide detailed analysis of its species, health, and care recommendations, its characteristics, care instructions, and any interesting facts. Please provide the response in plain text without using any markdown formatting";

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Content filtered")]
    ContentFiltered,

    #[error("Model returned no text")]
    EmptyResponse,

    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Trait for multimodal analysis backends (e.g., Gemini).
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Analyze one image and return the model's plain-text answer verbatim.
    async fn analyze(&self, image: &[u8], mime_type: &str) -> Result<String, ProviderError>;

    /// Health check.
    async fn health_check(&self) -> Result<(), ProviderError>;
}
