//! Object storage gateway
//!
//! A gateway performs a single put or delete against a key-addressed blob
//! store. It is stateless; delete is idempotent (deleting a missing key
//! succeeds).
//!
//! # Backends
//! - [`HttpObjectStore`] - `PUT`/`DELETE {endpoint}/{bucket}/{key}` over HTTP
//! - [`MemoryObjectStore`] - in-process store that records every call

pub mod http;
pub mod memory;

pub use http::HttpObjectStore;
pub use memory::{MemoryObjectStore, StoreCall};

use async_trait::async_trait;
use thiserror::Error;

/// Gateway call failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// No response from the store
    #[error("Network error: {0}")]
    Network(String),

    /// Store answered with a non-success status
    #[error("Store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Key could not be mapped to a request URL
    #[error("Invalid object key '{0}'")]
    InvalidKey(String),
}

/// Object storage capability
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Backend name for logging
    fn backend_tag(&self) -> &'static str;

    /// Store `bytes` under `key`, returning a publicly resolvable URL
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;

    /// Remove the object stored under `key`
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}
