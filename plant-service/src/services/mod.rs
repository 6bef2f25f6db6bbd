pub mod analysis;
pub mod data_uri;
pub mod report;
pub mod scratch;

pub use analysis::{AnalysisProvider, ProviderError};
pub use report::{ReportContent, ReportRenderer};
pub use scratch::{ScratchDir, ScratchFile};
