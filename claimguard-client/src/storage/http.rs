//! HTTP object storage backend
//!
//! Works with any store that accepts plain `PUT` and `DELETE` on object URLs
//! (public-write buckets, storage proxies, local dev servers).

use super::{ObjectStore, StorageError};
use async_trait::async_trait;
use claimguard_common::config::StorageConfig;
use reqwest::{StatusCode, Url};
use std::time::Duration;

const USER_AGENT: &str = concat!("ClaimGuard/", env!("CARGO_PKG_VERSION"));

/// Key-addressed blob store reached over HTTP
pub struct HttpObjectStore {
    http_client: reqwest::Client,
    endpoint: Url,
    public_base: Url,
    bucket: Option<String>,
}

impl HttpObjectStore {
    pub fn new(
        endpoint: &str,
        public_base_url: Option<&str>,
        bucket: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let endpoint = parse_base(endpoint)?;
        let public_base = match public_base_url {
            Some(url) => parse_base(url)?,
            None => endpoint.clone(),
        };

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint,
            public_base,
            bucket: bucket.filter(|b| !b.trim().is_empty()),
        })
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        Self::new(
            &config.endpoint,
            config.public_base_url.as_deref(),
            config.bucket.clone(),
            config.timeout(),
        )
    }

    /// Request URL for a key
    pub fn object_url(&self, key: &str) -> Result<Url, StorageError> {
        self.build_url(&self.endpoint, key)
    }

    /// Public URL handed back to callers after a successful put
    pub fn public_url(&self, key: &str) -> Result<Url, StorageError> {
        self.build_url(&self.public_base, key)
    }

    fn build_url(&self, base: &Url, key: &str) -> Result<Url, StorageError> {
        if key.is_empty() || key.split('/').any(str::is_empty) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        let mut url = base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StorageError::InvalidKey(key.to_string()))?;
            segments.pop_if_empty();
            if let Some(bucket) = &self.bucket {
                segments.push(bucket);
            }
            segments.extend(key.split('/'));
        }
        Ok(url)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    fn backend_tag(&self) -> &'static str {
        "http"
    }

    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let url = self.object_url(key)?;
        let size = bytes.len();

        tracing::debug!(key = %key, content_type = %content_type, size, "PUT object");

        let response = self
            .http_client
            .put(url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| StorageError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(self.public_url(key)?.to_string())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let url = self.object_url(key)?;

        tracing::debug!(key = %key, "DELETE object");

        let response = self
            .http_client
            .delete(url)
            .send()
            .await
            .map_err(|e| StorageError::Network(e.to_string()))?;

        let status = response.status();
        // Already gone counts as deleted
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        Err(StorageError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

fn parse_base(raw: &str) -> Result<Url, StorageError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| StorageError::InvalidKey(format!("{}: {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(StorageError::InvalidKey(raw.to_string()));
    }
    Ok(url)
}
