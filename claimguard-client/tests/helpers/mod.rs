//! Test Helper Utilities
//!
//! In-process HTTP doubles for claimguard-client integration tests:
//! - `MockScoringService` - multipart `POST /process` with a scripted reply
//! - `MockObjectServer` - `PUT`/`DELETE /{*key}` blob store

#![allow(dead_code)]

use axum::body::Bytes;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{post, put};
use axum::Router;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// One multipart part as the mock service received it
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedPart {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub size: usize,
}

struct ScoringState {
    status: StatusCode,
    body: String,
    delay: Duration,
    requests: AtomicUsize,
    parts: Mutex<Vec<Vec<ReceivedPart>>>,
}

/// Scoring service double listening on an ephemeral localhost port
pub struct MockScoringService {
    pub addr: SocketAddr,
    state: Arc<ScoringState>,
}

impl MockScoringService {
    /// Reply to every request with `status` and `body`
    pub async fn start(status: u16, body: impl Into<String>) -> Self {
        Self::start_with_delay(status, body, Duration::ZERO).await
    }

    pub async fn start_with_delay(status: u16, body: impl Into<String>, delay: Duration) -> Self {
        let state = Arc::new(ScoringState {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.into(),
            delay,
            requests: AtomicUsize::new(0),
            parts: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/process", post(process))
            .with_state(state.clone());
        let addr = serve(app).await;

        Self { addr, state }
    }

    pub fn analyze_url(&self) -> String {
        format!("http://{}/process", self.addr)
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    /// Parts of every request received so far, in arrival order
    pub async fn requests(&self) -> Vec<Vec<ReceivedPart>> {
        self.state.parts.lock().await.clone()
    }
}

async fn process(
    State(state): State<Arc<ScoringState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    state.requests.fetch_add(1, Ordering::SeqCst);

    let mut parts = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let size = field.bytes().await.map(|b| b.len()).unwrap_or(0);
        parts.push(ReceivedPart {
            field: field_name,
            file_name,
            content_type,
            size,
        });
    }
    state.parts.lock().await.push(parts);

    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    (
        state.status,
        [(header::CONTENT_TYPE, "application/json")],
        state.body.clone(),
    )
}

#[derive(Default)]
struct ObjectState {
    objects: Mutex<HashMap<String, (String, Vec<u8>)>>,
    reject_puts_containing: Mutex<Option<String>>,
}

/// Blob store double accepting `PUT` and `DELETE` on any path
pub struct MockObjectServer {
    pub addr: SocketAddr,
    state: Arc<ObjectState>,
}

impl MockObjectServer {
    pub async fn start() -> Self {
        let state = Arc::new(ObjectState::default());
        let app = Router::new()
            .route("/*key", put(put_object).delete(delete_object))
            .with_state(state.clone());
        let addr = serve(app).await;
        Self { addr, state }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Answer 500 to every `PUT` whose path contains `pattern`
    pub async fn reject_puts_containing(&self, pattern: &str) {
        *self.state.reject_puts_containing.lock().await = Some(pattern.to_string());
    }

    /// Stored paths (bucket included), sorted
    pub async fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.state.objects.lock().await.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub async fn content_type_of(&self, path: &str) -> Option<String> {
        self.state
            .objects
            .lock()
            .await
            .get(path)
            .map(|(content_type, _)| content_type.clone())
    }
}

async fn put_object(
    State(state): State<Arc<ObjectState>>,
    Path(key): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(pattern) = state.reject_puts_containing.lock().await.as_deref() {
        if key.contains(pattern) {
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state
        .objects
        .lock()
        .await
        .insert(key, (content_type, body.to_vec()));
    StatusCode::OK
}

async fn delete_object(
    State(state): State<Arc<ObjectState>>,
    Path(key): Path<String>,
) -> StatusCode {
    match state.objects.lock().await.remove(&key) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// An address nothing is listening on
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/process", addr)
}
