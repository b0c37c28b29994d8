//! Service modules for the submission-and-result pipeline
//!
//! - `analysis_client` - direct multipart submission to the scoring service
//! - `result_normalizer` - raw response → presentation model
//! - `upload_orchestrator` - optional archival of staged files to object storage

pub mod analysis_client;
pub mod result_normalizer;
pub mod upload_orchestrator;

pub use analysis_client::{AnalysisClient, FraudScorer};
pub use result_normalizer::{extract_sections, normalize, ExtractedSections};
pub use upload_orchestrator::{object_key, UploadOrchestrator};
