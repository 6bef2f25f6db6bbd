//! HTTP handlers for the plant service.

pub mod analysis;
pub mod health;
pub mod report;

pub use analysis::analyze_image;
pub use health::{health_check, readiness_check};
pub use report::download_report;
