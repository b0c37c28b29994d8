//! Data model for staging, archival, and analysis results

pub mod analysis_result;
pub mod category;
pub mod staged_file;
pub mod uploaded_asset;

pub use analysis_result::{gauge_angle, AnalysisResult, RiskLevel};
pub use category::Category;
pub use staged_file::StagedFile;
pub use uploaded_asset::UploadedAsset;
