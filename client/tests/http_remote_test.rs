//! Integration tests for the HTTP transport against a stub remote.
//!
//! The stub is a small axum service on an ephemeral port speaking the
//! record-mutation contract: type-scoped endpoints, success/failure
//! envelopes, and a health route.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use medisync_client::remote::{HttpRemote, RemoteError, RemoteStore};
use medisync_client::{SyncClient, SyncConfig};
use medisync_engine::{StoreName, SyncStatus};
use serde_json::{json, Value};

// ============================================================================
// Stub remote service
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct RecordedCall {
    kind: &'static str,
    entity_type: String,
    entity_id: String,
}

struct StubState {
    healthy: AtomicBool,
    accept: AtomicBool,
    calls: Mutex<Vec<RecordedCall>>,
}

impl StubState {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            healthy: AtomicBool::new(true),
            accept: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn envelope(&self) -> Json<Value> {
        if self.accept.load(Ordering::SeqCst) {
            Json(json!({"success": true}))
        } else {
            Json(json!({"success": false, "error": "validation failed"}))
        }
    }
}

async fn health_handler(State(state): State<Arc<StubState>>) -> StatusCode {
    if state.healthy.load(Ordering::SeqCst) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn create_handler(
    State(state): State<Arc<StubState>>,
    Path(entity_type): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let entity_id = body["data"]["id"].as_str().unwrap_or_default().to_string();
    state.calls.lock().unwrap().push(RecordedCall {
        kind: "create",
        entity_type,
        entity_id,
    });
    state.envelope()
}

async fn update_handler(
    State(state): State<Arc<StubState>>,
    Path((entity_type, entity_id)): Path<(String, String)>,
    Json(_body): Json<Value>,
) -> Json<Value> {
    state.calls.lock().unwrap().push(RecordedCall {
        kind: "update",
        entity_type,
        entity_id,
    });
    state.envelope()
}

async fn delete_handler(
    State(state): State<Arc<StubState>>,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> Json<Value> {
    state.calls.lock().unwrap().push(RecordedCall {
        kind: "delete",
        entity_type,
        entity_id,
    });
    state.envelope()
}

async fn spawn_stub(state: Arc<StubState>) -> String {
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/{entity_type}", post(create_handler))
        .route(
            "/api/{entity_type}/{entity_id}",
            put(update_handler).delete(delete_handler),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medisync_client=debug".into()),
        )
        .try_init();
}

// ============================================================================
// Transport behavior
// ============================================================================

#[tokio::test]
async fn health_probe_reflects_remote_state() {
    let state = StubState::new();
    let base = spawn_stub(state.clone()).await;
    let remote = HttpRemote::new(base.as_str(), Duration::from_secs(2)).unwrap();

    assert!(remote.health().await);

    state.healthy.store(false, Ordering::SeqCst);
    assert!(!remote.health().await);
}

#[tokio::test]
async fn create_hits_type_scoped_endpoint() {
    let state = StubState::new();
    let base = spawn_stub(state.clone()).await;
    let remote = HttpRemote::new(base.as_str(), Duration::from_secs(2)).unwrap();

    remote
        .create(StoreName::Patients, "p1", &json!({"id": "p1", "name": "Jane"}))
        .await
        .unwrap();

    assert_eq!(
        state.calls(),
        vec![RecordedCall {
            kind: "create",
            entity_type: "patients".into(),
            entity_id: "p1".into(),
        }]
    );
}

#[tokio::test]
async fn update_and_delete_address_the_entity() {
    let state = StubState::new();
    let base = spawn_stub(state.clone()).await;
    let remote = HttpRemote::new(base.as_str(), Duration::from_secs(2)).unwrap();

    remote
        .update(StoreName::LabResults, "lr_1", &json!({"id": "lr_1", "hb": 13.2}))
        .await
        .unwrap();
    remote.delete(StoreName::LabResults, "lr_1").await.unwrap();

    let kinds: Vec<_> = state
        .calls()
        .into_iter()
        .map(|call| (call.kind, call.entity_type, call.entity_id))
        .collect();
    assert_eq!(
        kinds,
        [
            ("update", "lab_results".to_string(), "lr_1".to_string()),
            ("delete", "lab_results".to_string(), "lr_1".to_string()),
        ]
    );
}

#[tokio::test]
async fn failure_envelope_is_a_rejection() {
    let state = StubState::new();
    state.accept.store(false, Ordering::SeqCst);
    let base = spawn_stub(state).await;
    let remote = HttpRemote::new(base.as_str(), Duration::from_secs(2)).unwrap();

    let result = remote.create(StoreName::Patients, "p1", &json!({"id": "p1"})).await;
    match result {
        Err(RemoteError::Rejected(reason)) => assert!(reason.contains("validation failed")),
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_remote_is_a_network_error() {
    // Bind to grab a free port, then drop the listener so nothing answers.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let remote = HttpRemote::new(format!("http://{addr}"), Duration::from_millis(500)).unwrap();

    let result = remote.create(StoreName::Patients, "p1", &json!({"id": "p1"})).await;
    assert!(matches!(result, Err(RemoteError::Network(_))));

    assert!(!remote.health().await);
}

// ============================================================================
// End to end over HTTP
// ============================================================================

#[tokio::test]
async fn full_pass_over_http() {
    init_tracing();

    let state = StubState::new();
    let base = spawn_stub(state.clone()).await;

    let config = SyncConfig::ephemeral(base.as_str()).with_request_timeout(Duration::from_secs(2));
    let client = SyncClient::connect(config).await.unwrap();

    client
        .save(StoreName::Patients, json!({"id": "p1", "name": "Jane"}))
        .await
        .unwrap();
    client
        .update(StoreName::Patients, "p1", json!({"name": "Jane A."}))
        .await
        .unwrap();
    client.delete(StoreName::Patients, "p1").await.unwrap();

    let summary = client.sync_now().await.unwrap();
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(client.state().status, SyncStatus::Synced);

    let kinds: Vec<_> = state.calls().into_iter().map(|call| call.kind).collect();
    assert_eq!(kinds, ["create", "update", "delete"]);
}

#[tokio::test]
async fn rejected_operations_accumulate_retry_state() {
    let state = StubState::new();
    state.accept.store(false, Ordering::SeqCst);
    let base = spawn_stub(state).await;

    let config = SyncConfig::ephemeral(base.as_str()).with_request_timeout(Duration::from_secs(2));
    let client = SyncClient::connect(config).await.unwrap();

    client.save(StoreName::Patients, json!({"id": "p1"})).await.unwrap();

    let summary = client.sync_now().await.unwrap();
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.failed, 1);

    let rows = medisync_client::db::pending_operations(client.pool()).await.unwrap();
    assert_eq!(rows[0].retry_count, 1);
    assert!(rows[0].last_error.as_deref().unwrap().contains("validation failed"));
}
