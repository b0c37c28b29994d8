//! Claim session
//!
//! Presentation boundary for one user session. Owns the staging store, the
//! archived asset list, and the latest analysis outcome. Clients are injected
//! once at construction and shared by `Arc`.
//!
//! All mutation goes through `&mut self`, so staging changes cannot
//! interleave with an in-flight submission.

use crate::error::{ClientError, ClientResult, ValidationError};
use crate::models::{AnalysisResult, Category, StagedFile, UploadedAsset};
use crate::services::{FraudScorer, UploadOrchestrator};
use crate::staging::{StagingState, StagingStore};
use chrono::Utc;
use claimguard_common::events::{ClaimEvent, EventBus};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct ClaimSession {
    staging: StagingStore,
    scorer: Arc<dyn FraudScorer>,
    archive: Option<UploadOrchestrator>,
    assets: Vec<UploadedAsset>,
    last_result: Option<AnalysisResult>,
    last_error: Option<String>,
    events: EventBus,
}

impl ClaimSession {
    pub fn new(scorer: Arc<dyn FraudScorer>) -> Self {
        Self {
            staging: StagingStore::new(),
            scorer,
            archive: None,
            assets: Vec::new(),
            last_result: None,
            last_error: None,
            events: EventBus::default(),
        }
    }

    /// Enable asset archival through an upload orchestrator
    pub fn with_archive(mut self, orchestrator: UploadOrchestrator) -> Self {
        self.archive = Some(orchestrator);
        self
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ------------------------------------------------------------------------
    // Staging
    // ------------------------------------------------------------------------

    /// Stage files; any previous result or error becomes stale and is cleared
    pub fn add_files(
        &mut self,
        category: Category,
        files: Vec<StagedFile>,
    ) -> ClientResult<usize> {
        let count = files.len();
        let staged = self.staging.add_files(category, files)?;
        self.last_result = None;
        self.last_error = None;
        self.events.emit_lossy(ClaimEvent::FilesStaged {
            category: category.to_string(),
            count,
            timestamp: Utc::now(),
        });
        Ok(staged)
    }

    pub fn remove_file(&mut self, category: Category, index: usize) -> ClientResult<StagedFile> {
        let removed = self.staging.remove_file(category, index)?;
        self.events.emit_lossy(ClaimEvent::FileRemoved {
            category: category.to_string(),
            index,
            timestamp: Utc::now(),
        });
        Ok(removed)
    }

    pub fn clear_all(&mut self) {
        self.staging.clear_all();
    }

    pub fn staging(&self) -> &StagingState {
        self.staging.state()
    }

    pub fn snapshot(&self) -> StagingState {
        self.staging.snapshot()
    }

    /// Submission is possible only with at least one staged file
    pub fn can_submit(&self) -> bool {
        !self.staging.is_empty()
    }

    // ------------------------------------------------------------------------
    // Direct-submit flow
    // ------------------------------------------------------------------------

    /// Submit every staged file for fraud analysis
    ///
    /// On success the result replaces any previous one and staging is cleared.
    /// On failure the result is cleared and staging is kept for a re-submit.
    pub async fn submit(&mut self) -> ClientResult<AnalysisResult> {
        self.submit_with_cancel(&CancellationToken::new()).await
    }

    pub async fn submit_with_cancel(
        &mut self,
        cancel: &CancellationToken,
    ) -> ClientResult<AnalysisResult> {
        if self.staging.is_empty() {
            return Err(self.record_failure(ValidationError::NoFilesSelected.into()));
        }

        let snapshot = self.staging.snapshot();
        self.events.emit_lossy(ClaimEvent::SubmissionStarted {
            file_count: snapshot.total_files(),
            timestamp: Utc::now(),
        });

        let outcome = tokio::select! {
            result = self.scorer.analyze(&snapshot) => result,
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
        };

        match outcome {
            Ok(result) => {
                info!(
                    probability = result.probability,
                    risk_level = %result.risk_level,
                    "Submission complete"
                );
                self.staging.clear_all();
                self.last_error = None;
                self.last_result = Some(result.clone());
                self.events.emit_lossy(ClaimEvent::AnalysisCompleted {
                    probability: result.probability,
                    risk_level: result.risk_level.to_string(),
                    timestamp: Utc::now(),
                });
                Ok(result)
            }
            Err(e) => Err(self.record_failure(e)),
        }
    }

    pub fn last_result(&self) -> Option<&AnalysisResult> {
        self.last_result.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    // ------------------------------------------------------------------------
    // Asset archival
    // ------------------------------------------------------------------------

    /// Upload every staged file to object storage
    ///
    /// All-or-nothing: on failure no asset is added and staging is kept.
    /// A failed archive leaves the last analysis result in place.
    pub async fn archive(
        &mut self,
        cancel: &CancellationToken,
    ) -> ClientResult<Vec<UploadedAsset>> {
        let Some(orchestrator) = self.archive.as_ref() else {
            return Err(ClientError::StorageNotConfigured);
        };

        let snapshot = self.staging.snapshot();
        match orchestrator.upload_all(&snapshot, cancel).await {
            Ok(uploaded) => {
                self.staging.clear_all();
                self.last_error = None;
                self.assets.extend(uploaded.iter().cloned());
                self.events.emit_lossy(ClaimEvent::AssetsUploaded {
                    count: uploaded.len(),
                    timestamp: Utc::now(),
                });
                Ok(uploaded)
            }
            Err(e) => {
                warn!(error = %e, "Archive failed; staging kept");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub fn assets(&self) -> &[UploadedAsset] {
        &self.assets
    }

    /// Delete one archived asset; it leaves the list only once the delete succeeded
    pub async fn delete_asset(&mut self, asset: &UploadedAsset) -> ClientResult<()> {
        let Some(orchestrator) = self.archive.as_ref() else {
            return Err(ClientError::StorageNotConfigured);
        };

        match orchestrator.delete_asset(asset).await {
            Ok(()) => {
                self.assets.retain(|a| a != asset);
                self.events.emit_lossy(ClaimEvent::AssetDeleted {
                    url: asset.url.clone(),
                    timestamp: Utc::now(),
                });
                Ok(())
            }
            Err(e) => {
                warn!(key = %asset.key, error = %e, "Asset delete failed; list unchanged");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Delete every archived asset; the list is cleared only if all deletes succeed
    pub async fn delete_all_assets(&mut self) -> ClientResult<()> {
        let Some(orchestrator) = self.archive.as_ref() else {
            return Err(ClientError::StorageNotConfigured);
        };

        match orchestrator.delete_batch(&self.assets).await {
            Ok(()) => {
                for asset in self.assets.drain(..) {
                    self.events.emit_lossy(ClaimEvent::AssetDeleted {
                        url: asset.url,
                        timestamp: Utc::now(),
                    });
                }
                Ok(())
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn record_failure(&mut self, error: ClientError) -> ClientError {
        warn!(error = %error, retryable = error.is_retryable(), "Submission failed");
        self.last_result = None;
        self.last_error = Some(error.to_string());
        self.events.emit_lossy(ClaimEvent::SubmissionFailed {
            message: error.to_string(),
            retryable: error.is_retryable(),
            timestamp: Utc::now(),
        });
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskLevel;
    use crate::storage::{MemoryObjectStore, ObjectStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted scorer that records what it was asked to score
    struct ScriptedScorer {
        calls: AtomicUsize,
        seen_files: Mutex<Vec<usize>>,
        response: Mutex<Option<ClientResult<AnalysisResult>>>,
    }

    impl ScriptedScorer {
        fn returning(response: ClientResult<AnalysisResult>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                seen_files: Mutex::new(Vec::new()),
                response: Mutex::new(Some(response)),
            })
        }
    }

    #[async_trait]
    impl FraudScorer for ScriptedScorer {
        async fn analyze(&self, state: &StagingState) -> ClientResult<AnalysisResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_files.lock().unwrap().push(state.total_files());
            self.response
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(ClientError::Network("no scripted response".into())))
        }
    }

    fn high_risk() -> AnalysisResult {
        AnalysisResult {
            probability: 72.0,
            risk_level: RiskLevel::High,
            ..Default::default()
        }
    }

    fn image(name: &str) -> StagedFile {
        StagedFile::new(name, "image/jpeg", Category::Image, vec![1, 2, 3])
    }

    #[tokio::test]
    async fn test_submit_empty_session_makes_no_call() {
        let scorer = ScriptedScorer::returning(Ok(high_risk()));
        let mut session = ClaimSession::new(scorer.clone());

        let err = session.submit().await.unwrap_err();

        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::NoFilesSelected)
        ));
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
        assert!(session.last_error().is_some());
        assert!(!session.can_submit());
    }

    #[tokio::test]
    async fn test_successful_submit_clears_staging_and_stores_result() {
        let scorer = ScriptedScorer::returning(Ok(high_risk()));
        let mut session = ClaimSession::new(scorer.clone());
        let mut rx = session.events().subscribe();
        session.add_files(Category::Image, vec![image("a.jpg"), image("b.jpg")]).unwrap();

        let result = session.submit().await.unwrap();

        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(*scorer.seen_files.lock().unwrap(), vec![2]);
        assert!(session.staging().is_empty());
        assert_eq!(session.last_result(), Some(&result));
        assert!(session.last_error().is_none());

        let mut types = Vec::new();
        while let Ok(event) = rx.try_recv() {
            types.push(event.event_type());
        }
        assert_eq!(types, vec!["FilesStaged", "SubmissionStarted", "AnalysisCompleted"]);
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_staging_and_clears_result() {
        let scorer = ScriptedScorer::returning(Ok(high_risk()));
        let mut session = ClaimSession::new(scorer.clone());
        session.add_files(Category::Image, vec![image("a.jpg")]).unwrap();
        session.submit().await.unwrap();

        // Second submission hits the scorer's exhausted script → Network error
        session.add_files(Category::Image, vec![image("b.jpg")]).unwrap();
        let err = session.submit().await.unwrap_err();

        assert!(err.is_retryable());
        assert!(session.last_result().is_none());
        assert_eq!(session.staging().files(Category::Image).len(), 1);
        assert!(session.last_error().unwrap().contains("no scripted response"));
    }

    #[tokio::test]
    async fn test_add_files_invalidates_previous_result() {
        let scorer = ScriptedScorer::returning(Ok(high_risk()));
        let mut session = ClaimSession::new(scorer);
        session.add_files(Category::Image, vec![image("a.jpg")]).unwrap();
        session.submit().await.unwrap();
        assert!(session.last_result().is_some());

        session.add_files(Category::Image, vec![image("b.jpg")]).unwrap();

        assert!(session.last_result().is_none());
    }

    /// Scorer that never answers within a test's lifetime
    struct StalledScorer;

    #[async_trait]
    impl FraudScorer for StalledScorer {
        async fn analyze(&self, _state: &StagingState) -> ClientResult<AnalysisResult> {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            Ok(high_risk())
        }
    }

    #[tokio::test]
    async fn test_cancelled_submit_reports_cancelled() {
        let mut session = ClaimSession::new(Arc::new(StalledScorer));
        session.add_files(Category::Image, vec![image("a.jpg")]).unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = session.submit_with_cancel(&cancel).await.unwrap_err();

        assert!(matches!(err, ClientError::Cancelled));
        assert_eq!(session.staging().total_files(), 1);
        assert!(session.last_result().is_none());
        assert_eq!(session.last_error(), Some("Operation cancelled"));
    }

    fn archiving_session(
        scorer: Arc<dyn FraudScorer>,
        store: &Arc<MemoryObjectStore>,
    ) -> ClaimSession {
        ClaimSession::new(scorer)
            .with_archive(UploadOrchestrator::new(store.clone() as Arc<dyn ObjectStore>))
    }

    #[tokio::test]
    async fn test_failed_archive_keeps_analysis_result() {
        let store = Arc::new(MemoryObjectStore::default());
        let scorer = ScriptedScorer::returning(Ok(high_risk()));
        let mut session = archiving_session(scorer, &store);
        session.add_files(Category::Image, vec![image("a.jpg")]).unwrap();
        let result = session.submit().await.unwrap();
        let mut rx = session.events().subscribe();

        // Staging was cleared by the submit
        let err = session.archive(&CancellationToken::new()).await.unwrap_err();

        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::NoFilesSelected)
        ));
        assert_eq!(session.last_result(), Some(&result));
        assert!(session.last_error().is_some());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_upload_keeps_staging() {
        let store = Arc::new(MemoryObjectStore::default());
        store.fail_puts_matching("bad.jpg").await;
        let scorer = ScriptedScorer::returning(Ok(high_risk()));
        let mut session = archiving_session(scorer, &store);
        session.add_files(Category::Image, vec![image("bad.jpg")]).unwrap();

        let err = session.archive(&CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, ClientError::UploadFailed { .. }));
        assert_eq!(session.staging().total_files(), 1);
        assert!(session.assets().is_empty());
    }

    #[tokio::test]
    async fn test_archive_without_storage_is_rejected() {
        let scorer = ScriptedScorer::returning(Ok(high_risk()));
        let mut session = ClaimSession::new(scorer);
        session.add_files(Category::Image, vec![image("a.jpg")]).unwrap();

        let err = session.archive(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ClientError::StorageNotConfigured));
        assert_eq!(session.staging().total_files(), 1);
    }

    #[tokio::test]
    async fn test_delete_asset_failure_leaves_list_unchanged() {
        let store = Arc::new(MemoryObjectStore::default());
        let scorer = ScriptedScorer::returning(Ok(high_risk()));
        let mut session = archiving_session(scorer, &store);
        session.add_files(Category::Image, vec![image("a.jpg")]).unwrap();
        let assets = session.archive(&CancellationToken::new()).await.unwrap();
        assert_eq!(session.assets().len(), 1);

        store.fail_deletes_matching("a.jpg").await;
        let err = session.delete_asset(&assets[0]).await.unwrap_err();
        assert!(matches!(err, ClientError::DeleteFailed { .. }));
        assert_eq!(session.assets(), assets.as_slice());

        store.clear_failures().await;
        session.delete_asset(&assets[0]).await.unwrap();
        assert!(session.assets().is_empty());
        assert!(store.keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_all_assets_is_all_or_nothing() {
        let store = Arc::new(MemoryObjectStore::default());
        let scorer = ScriptedScorer::returning(Ok(high_risk()));
        let mut session = archiving_session(scorer, &store);
        session
            .add_files(
                Category::Image,
                vec![image("a.jpg"), image("b.jpg"), image("c.jpg")],
            )
            .unwrap();
        let assets = session.archive(&CancellationToken::new()).await.unwrap();
        assert_eq!(assets.len(), 3);

        store.fail_deletes_matching(assets[1].key.clone()).await;
        let err = session.delete_all_assets().await.unwrap_err();

        assert!(matches!(err, ClientError::DeleteFailed { ref key, .. } if *key == assets[1].key));
        assert_eq!(session.assets(), assets.as_slice());
        assert!(store.contains(&assets[1].key).await);

        // Deletes are idempotent, so retrying the whole list is safe
        store.clear_failures().await;
        session.delete_all_assets().await.unwrap();
        assert!(session.assets().is_empty());
        assert!(store.keys().await.is_empty());
    }
}
