//! Error types for claimguard-client
//!
//! Failure classes surfaced by staging, upload orchestration, and the
//! analysis request. Only `Network` is considered retryable; every retry is
//! user-initiated.

use crate::models::Category;
use thiserror::Error;

/// Rejected before any network activity
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Submission attempted with every category empty
    #[error("Please select at least one file to upload")]
    NoFilesSelected,

    /// `add_files` called with an empty file list
    #[error("No files provided for category {0}")]
    EmptyFileSet(Category),

    /// A staged file was offered to the wrong category
    #[error("File '{name}' belongs to category {actual}, not {expected}")]
    CategoryMismatch {
        name: String,
        expected: Category,
        actual: Category,
    },

    /// File type could not be mapped to any category
    #[error("Unsupported file type for '{0}'")]
    UnsupportedFileType(String),
}

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// Input rejected locally; no network call was made
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No response was received (connection failure or timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Scoring service answered with a failure
    #[error("{message}")]
    Service { message: String },

    /// Object storage put failed
    #[error("Upload failed for '{key}': {reason}")]
    UploadFailed { key: String, reason: String },

    /// Object storage delete failed; asset list left unchanged
    #[error("Failed to delete '{key}': {reason}")]
    DeleteFailed { key: String, reason: String },

    /// Staging mutation with an index outside `[0, len)`
    #[error("Index {index} out of range for {category} (len {len})")]
    IndexOutOfRange {
        category: Category,
        index: usize,
        len: usize,
    },

    /// Asset archival requested without an object storage gateway
    #[error("Object storage is not configured")]
    StorageNotConfigured,

    /// Operation cancelled via its cancellation token
    #[error("Operation cancelled")]
    Cancelled,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// claimguard-common error
    #[error("Common error: {0}")]
    Common(#[from] claimguard_common::Error),
}

impl ClientError {
    pub fn service(message: impl Into<String>) -> Self {
        ClientError::Service {
            message: message.into(),
        }
    }

    /// True when re-submitting the same batch may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Network(_))
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_network_is_retryable() {
        assert!(ClientError::Network("timeout".into()).is_retryable());
        assert!(!ClientError::service("bad claim").is_retryable());
        assert!(!ClientError::from(ValidationError::NoFilesSelected).is_retryable());
        assert!(!ClientError::Cancelled.is_retryable());
    }

    #[test]
    fn test_service_error_displays_message_verbatim() {
        let err = ClientError::service("No files provided.");
        assert_eq!(err.to_string(), "No files provided.");
    }
}
