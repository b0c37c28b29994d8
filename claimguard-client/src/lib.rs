//! claimguard-client library interface
//!
//! Stages evidence files by category, submits them for fraud scoring and
//! exposes the normalized result. Optionally archives the files to object
//! storage.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod session;
pub mod staging;
pub mod storage;

pub use crate::error::{ClientError, ClientResult, ValidationError};
pub use crate::models::{AnalysisResult, Category, RiskLevel, StagedFile, UploadedAsset};
pub use crate::session::ClaimSession;
pub use crate::staging::{StagingState, StagingStore};
