//! Session assembly from configuration
//!
//! Builds the scoring client and, when `[storage]` is configured, the
//! archival orchestrator over an HTTP object store.

use crate::error::{ClientError, ClientResult};
use crate::services::{AnalysisClient, UploadOrchestrator};
use crate::session::ClaimSession;
use crate::storage::{HttpObjectStore, ObjectStore};
use claimguard_common::config::ClientConfig;
use std::sync::Arc;
use tracing::info;

/// Build a ready-to-use session from a resolved configuration
pub fn build_session(config: &ClientConfig) -> ClientResult<ClaimSession> {
    let scorer = AnalysisClient::from_config(config)?;
    info!(
        url = %scorer.analyze_url(),
        timeout_secs = config.request_timeout_secs,
        "Scoring client ready"
    );

    let mut session = ClaimSession::new(Arc::new(scorer));
    if let Some(orchestrator) = build_orchestrator(config)? {
        session = session.with_archive(orchestrator);
    }
    Ok(session)
}

/// Archival orchestrator, or `None` when storage is not configured
pub fn build_orchestrator(config: &ClientConfig) -> ClientResult<Option<UploadOrchestrator>> {
    let Some(storage) = &config.storage else {
        return Ok(None);
    };

    let store = HttpObjectStore::from_config(storage).map_err(|e| {
        ClientError::Common(claimguard_common::Error::Config(format!(
            "storage: {}",
            e
        )))
    })?;
    info!(endpoint = %storage.endpoint, "Object storage configured");
    Ok(Some(UploadOrchestrator::new(
        Arc::new(store) as Arc<dyn ObjectStore>
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimguard_common::config::StorageConfig;

    #[test]
    fn test_no_storage_means_no_archive() {
        let config = ClientConfig::default();
        assert!(build_orchestrator(&config).unwrap().is_none());
        assert!(build_session(&config).is_ok());
    }

    #[test]
    fn test_storage_section_enables_archive() {
        let config = ClientConfig {
            storage: Some(StorageConfig {
                endpoint: "http://localhost:9000".to_string(),
                bucket: Some("claims".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let orchestrator = build_orchestrator(&config).unwrap().unwrap();
        assert_eq!(orchestrator.store().backend_tag(), "http");
    }

    #[test]
    fn test_bad_storage_endpoint_is_config_error() {
        let config = ClientConfig {
            storage: Some(StorageConfig {
                endpoint: "not a url".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(matches!(
            build_orchestrator(&config),
            Err(ClientError::Common(claimguard_common::Error::Config(_)))
        ));
    }
}
