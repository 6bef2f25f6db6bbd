use serde::{Deserialize, Serialize};

/// Body of a successful `POST /analyze`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisResponse {
    /// Plain-text analysis from the model.
    pub results: String,
    /// The uploaded image as a `data:` URI.
    pub image: String,
}
