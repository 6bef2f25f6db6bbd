use serde::{Deserialize, Serialize};

/// Body of `POST /download`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportRequest {
    pub result: String,
    #[serde(default)]
    pub image: Option<String>,
}
