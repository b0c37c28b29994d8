//! Upload orchestrator
//!
//! Fans staged files out to the object storage gateway concurrently and joins
//! the results with all-or-nothing semantics:
//! - Every file in a batch is put under a unique `{category}/{timestamp}-{name}` key
//! - Uploads within a category run concurrently (bounded by `max_concurrency`)
//! - Cross-category batches run one group per category, joined at the top level
//! - If any upload fails, or the batch is cancelled before every upload was
//!   dispatched, the uploads that did succeed are deleted again (compensation)
//!   and the caller only sees the error
//!
//! Compensation is best-effort: an orphan is logged when its delete fails.

use crate::error::{ClientError, ClientResult, ValidationError};
use crate::models::{Category, StagedFile, UploadedAsset};
use crate::staging::StagingState;
use crate::storage::ObjectStore;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default number of in-flight puts per category group
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Result of one category group, before the all-or-nothing decision
struct GroupOutcome {
    succeeded: Vec<UploadedAsset>,
    error: Option<ClientError>,
}

/// Concurrent, all-or-nothing uploader over an [`ObjectStore`]
pub struct UploadOrchestrator {
    store: Arc<dyn ObjectStore>,
    max_concurrency: usize,
}

impl UploadOrchestrator {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Limit in-flight puts per category (minimum 1)
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Upload every file of one category
    ///
    /// # Returns
    /// One asset per file, in input order, or the first failure.
    pub async fn upload_batch(
        &self,
        category: Category,
        files: &[StagedFile],
    ) -> ClientResult<Vec<UploadedAsset>> {
        self.upload_batch_with_cancel(category, files, &CancellationToken::new())
            .await
    }

    pub async fn upload_batch_with_cancel(
        &self,
        category: Category,
        files: &[StagedFile],
        cancel: &CancellationToken,
    ) -> ClientResult<Vec<UploadedAsset>> {
        if files.is_empty() {
            return Err(ValidationError::EmptyFileSet(category).into());
        }

        let timestamp = submission_timestamp();
        info!(
            category = %category,
            files = files.len(),
            backend = self.store.backend_tag(),
            "Uploading batch"
        );

        let outcome = self.upload_group(category, files, timestamp, cancel).await;
        self.settle(vec![outcome]).await
    }

    /// Upload every staged file across all categories
    ///
    /// Categories are uploaded as independent concurrent groups; any group
    /// failing fails the whole call.
    pub async fn upload_all(
        &self,
        state: &StagingState,
        cancel: &CancellationToken,
    ) -> ClientResult<Vec<UploadedAsset>> {
        if state.is_empty() {
            return Err(ValidationError::NoFilesSelected.into());
        }

        let timestamp = submission_timestamp();
        info!(
            files = state.total_files(),
            bytes = state.total_bytes(),
            backend = self.store.backend_tag(),
            "Uploading staged files"
        );

        let groups = state
            .non_empty_categories()
            .map(|category| self.upload_group(category, state.files(category), timestamp, cancel));
        let outcomes = join_all(groups).await;

        self.settle(outcomes).await
    }

    /// Delete one archived asset
    pub async fn delete_asset(&self, asset: &UploadedAsset) -> ClientResult<()> {
        debug!(key = %asset.key, category = %asset.category, "Deleting asset");
        self.store
            .delete(&asset.key)
            .await
            .map_err(|e| ClientError::DeleteFailed {
                key: asset.key.clone(),
                reason: e.to_string(),
            })
    }

    /// Delete assets concurrently; fails if any single delete fails
    pub async fn delete_batch(&self, assets: &[UploadedAsset]) -> ClientResult<()> {
        if assets.is_empty() {
            return Ok(());
        }

        info!(assets = assets.len(), "Deleting asset batch");
        let results = join_all(assets.iter().map(|asset| self.delete_asset(asset))).await;

        let mut failures = results.into_iter().filter_map(Result::err);
        match failures.next() {
            None => Ok(()),
            Some(first) => {
                let remaining = failures.count();
                warn!(error = %first, additional_failures = remaining, "Asset batch delete failed");
                Err(first)
            }
        }
    }

    async fn upload_group(
        &self,
        category: Category,
        files: &[StagedFile],
        timestamp: i64,
        cancel: &CancellationToken,
    ) -> GroupOutcome {
        let keys = batch_keys(category, timestamp, files);

        let mut results: Vec<(usize, ClientResult<UploadedAsset>)> =
            stream::iter(files.iter().zip(keys).enumerate())
                .map(|(index, (file, key))| async move {
                    (index, self.upload_one(category, file, key, cancel).await)
                })
                .buffer_unordered(self.max_concurrency)
                .collect()
                .await;
        // Completion order is arbitrary; restore input order
        results.sort_by_key(|(index, _)| *index);

        let mut succeeded = Vec::with_capacity(results.len());
        let mut error: Option<ClientError> = None;
        for (_, result) in results {
            match result {
                Ok(asset) => succeeded.push(asset),
                Err(e) => record_error(&mut error, e),
            }
        }

        debug!(
            category = %category,
            succeeded = succeeded.len(),
            failed = error.is_some(),
            "Upload group joined"
        );
        GroupOutcome { succeeded, error }
    }

    async fn upload_one(
        &self,
        category: Category,
        file: &StagedFile,
        key: String,
        cancel: &CancellationToken,
    ) -> ClientResult<UploadedAsset> {
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }

        match self
            .store
            .put(&key, file.bytes().to_vec(), file.content_type())
            .await
        {
            Ok(url) => {
                debug!(key = %key, url = %url, "Upload complete");
                Ok(UploadedAsset { url, key, category })
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Upload failed");
                Err(ClientError::UploadFailed {
                    key,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// All-or-nothing join over category groups
    async fn settle(&self, outcomes: Vec<GroupOutcome>) -> ClientResult<Vec<UploadedAsset>> {
        let mut succeeded = Vec::new();
        let mut error: Option<ClientError> = None;
        for outcome in outcomes {
            succeeded.extend(outcome.succeeded);
            if let Some(e) = outcome.error {
                record_error(&mut error, e);
            }
        }

        match error {
            None => {
                info!(assets = succeeded.len(), "Upload batch complete");
                Ok(succeeded)
            }
            Some(e) => {
                self.compensate(&succeeded).await;
                Err(e)
            }
        }
    }

    /// Delete uploads that succeeded in a batch that failed overall
    async fn compensate(&self, uploaded: &[UploadedAsset]) {
        if uploaded.is_empty() {
            return;
        }

        warn!(uploads = uploaded.len(), "Batch failed, deleting completed uploads");
        let results = join_all(uploaded.iter().map(|asset| self.delete_asset(asset))).await;

        for (asset, result) in uploaded.iter().zip(results) {
            if let Err(e) = result {
                warn!(
                    key = %asset.key,
                    url = %asset.url,
                    error = %e,
                    "Orphaned object left in storage"
                );
            }
        }
    }
}

/// Keep the first failure; a real failure outranks a cancellation skip
fn record_error(slot: &mut Option<ClientError>, error: ClientError) {
    let replace = match slot {
        None => true,
        Some(ClientError::Cancelled) => !matches!(error, ClientError::Cancelled),
        Some(_) => false,
    };
    if replace {
        *slot = Some(error);
    }
}

/// Object key for a file: `{category}/{timestamp}-{name}`
///
/// Path separators in the file name are replaced so the key stays two levels deep.
pub fn object_key(category: Category, timestamp_ms: i64, file_name: &str) -> String {
    format!("{}/{}-{}", category.as_str(), timestamp_ms, sanitize_file_name(file_name))
}

/// Keys for a whole batch; repeated names get a numeric disambiguator
fn batch_keys(category: Category, timestamp_ms: i64, files: &[StagedFile]) -> Vec<String> {
    let mut used = HashSet::with_capacity(files.len());
    files
        .iter()
        .map(|file| {
            let name = sanitize_file_name(file.name());
            let mut key = object_key(category, timestamp_ms, &name);
            let mut n = 1;
            while used.contains(&key) {
                key = format!("{}/{}-{}-{}", category.as_str(), timestamp_ms, n, name);
                n += 1;
            }
            used.insert(key.clone());
            key
        })
        .collect()
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

fn submission_timestamp() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
