//! Fraud-scoring service client
//!
//! Sends every staged file in one multipart POST and classifies the outcome:
//! - empty staging state → `Validation(NoFilesSelected)`, no request made
//! - no response (connect failure, timeout) → `Network`
//! - non-2xx → `Service` with the body's `detail`/`message`, else the status text
//! - 2xx carrying `{"status": "error"}` → `Service`
//! - 2xx otherwise → normalized [`AnalysisResult`]

use super::result_normalizer::normalize;
use crate::error::{ClientError, ClientResult, ValidationError};
use crate::models::{AnalysisResult, StagedFile};
use crate::staging::StagingState;
use async_trait::async_trait;
use claimguard_common::config::ClientConfig;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Scoring capability consumed by a session
#[async_trait]
pub trait FraudScorer: Send + Sync {
    /// Score every staged file as one batch
    async fn analyze(&self, state: &StagingState) -> ClientResult<AnalysisResult>;
}

/// Failure body shape: FastAPI-style `detail` or a plain `message`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorBody {
    detail: Option<Value>,
    message: Option<String>,
    status: Option<String>,
}

impl ErrorBody {
    fn message(&self) -> Option<String> {
        let detail = match &self.detail {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            // Validation errors arrive as [{"msg": ...}, ...]
            Some(Value::Array(items)) => {
                let messages: Vec<&str> = items
                    .iter()
                    .filter_map(|i| i.get("msg").and_then(Value::as_str))
                    .collect();
                (!messages.is_empty()).then(|| messages.join("; "))
            }
            _ => None,
        };
        detail.or_else(|| self.message.clone().filter(|m| !m.trim().is_empty()))
    }
}

/// HTTP client for the scoring service's multipart endpoint
pub struct AnalysisClient {
    http_client: reqwest::Client,
    analyze_url: String,
}

impl AnalysisClient {
    pub fn new(
        analyze_url: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> ClientResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            analyze_url: analyze_url.into(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        Self::new(config.analyze_url(), config.request_timeout(), &config.user_agent)
    }

    pub fn analyze_url(&self) -> &str {
        &self.analyze_url
    }

    /// Build the multipart body: one part per file, named by category field
    pub fn build_form(state: &StagingState) -> Form {
        state.iter().fold(Form::new(), |form, (category, file)| {
            form.part(category.field_name(), file_part(file))
        })
    }
}

#[async_trait]
impl FraudScorer for AnalysisClient {
    async fn analyze(&self, state: &StagingState) -> ClientResult<AnalysisResult> {
        if state.is_empty() {
            return Err(ValidationError::NoFilesSelected.into());
        }

        let fields: Vec<String> = state
            .non_empty_categories()
            .map(|c| format!("{}={}", c.field_name(), state.files(c).len()))
            .collect();
        info!(
            url = %self.analyze_url,
            files = state.total_files(),
            bytes = state.total_bytes(),
            fields = %fields.join(","),
            "Submitting batch for fraud analysis"
        );

        let response = self
            .http_client
            .post(&self.analyze_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(Self::build_form(state))
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, timeout = e.is_timeout(), "Scoring request failed");
                ClientError::Network(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        if !status.is_success() {
            let err = classify_failure(status, &body);
            warn!(status = status.as_u16(), error = %err, "Scoring service rejected batch");
            return Err(err);
        }

        let value: Value = serde_json::from_slice(&body).map_err(|e| {
            ClientError::service(format!("Malformed response from scoring service: {}", e))
        })?;

        if let Some(message) = soft_error(&value) {
            warn!(message = %message, "Scoring service reported failure in success body");
            return Err(ClientError::service(message));
        }

        let result = normalize(&value);
        info!(
            probability = result.probability,
            risk_level = %result.risk_level,
            red_flags = result.red_flags.len(),
            "Fraud analysis received"
        );
        Ok(result)
    }
}

fn file_part(file: &StagedFile) -> Part {
    let part = || Part::bytes(file.bytes().to_vec()).file_name(file.name().to_string());
    part()
        .mime_str(file.content_type())
        .or_else(|e| {
            debug!(file = %file.name(), error = %e, "Invalid MIME type, using category default");
            part().mime_str(file.category().default_content_type())
        })
        .unwrap_or_else(|_| part())
}

/// Map a non-2xx response to a `Service` error
fn classify_failure(status: StatusCode, body: &[u8]) -> ClientError {
    let parsed = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message());

    let message = parsed.unwrap_or_else(|| match status.canonical_reason() {
        Some(reason) => reason.to_string(),
        None => format!("Analysis failed with status {}", status.as_u16()),
    });
    ClientError::service(message)
}

/// A 2xx body with `"status": "error"` is a failure
fn soft_error(value: &Value) -> Option<String> {
    if !value.is_object() {
        return None;
    }
    let body = ErrorBody::deserialize(value).ok()?;
    if body.status.as_deref()?.eq_ignore_ascii_case("error") {
        Some(
            body.message()
                .unwrap_or_else(|| "Analysis failed".to_string()),
        )
    } else {
        None
    }
}
