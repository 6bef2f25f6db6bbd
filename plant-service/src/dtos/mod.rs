pub mod analysis;
pub mod report;

pub use analysis::AnalysisResponse;
pub use report::ReportRequest;
