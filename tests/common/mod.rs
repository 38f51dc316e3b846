//! Shared test harness: a scripted transport standing in for the backend, plus
//! session seeding helpers.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use viatica::http::{ApiRequest, ApiResponse, HttpTransport, TransportError};
use viatica::nav::RecordingNavigator;
use viatica::session::SessionManager;
use viatica::storage::{keys, KvStorage, MemoryStorage};

/// Responds from per-path queues (keyed on the path component, query ignored)
/// and records every request it sees. An exhausted or unscripted path answers
/// 200 with an empty object. Yields once before responding so concurrent
/// callers genuinely interleave.
pub struct MockTransport {
    requests: Mutex<Vec<ApiRequest>>,
    scripts: Mutex<HashMap<String, VecDeque<Result<ApiResponse, TransportError>>>>,
}

fn path_component(path: &str) -> &str {
    path.split('?').next().unwrap_or(path)
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { requests: Mutex::new(Vec::new()), scripts: Mutex::new(HashMap::new()) })
    }

    pub fn enqueue(&self, path: &str, resp: ApiResponse) {
        self.scripts
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(Ok(resp));
    }

    pub fn enqueue_error(&self, path: &str, message: &str) {
        self.scripts
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(Err(TransportError::Send(message.to_string())));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|req| path_component(&req.path) == path)
            .count()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, req: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.lock().push(req.clone());
        tokio::task::yield_now().await;
        let mut scripts = self.scripts.lock();
        if let Some(queue) = scripts.get_mut(path_component(&req.path)) {
            if let Some(scripted) = queue.pop_front() {
                return scripted;
            }
        }
        Ok(ApiResponse::new(200, serde_json::json!({})))
    }
}

pub fn user_json(role: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "u1",
        "email": "ana@acme.cl",
        "name": "Ana Rojas",
        "role": role,
        "permissions": ["trips:read", "invoices:read"]
    })
}

pub fn tenant_json(id: &str, name: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "businessName": name,
        "rut": "76.123.456-0"
    })
}

/// A full successful login payload: admin user under tenant `t-a`, with a
/// second tenant available.
pub fn login_body() -> serde_json::Value {
    serde_json::json!({
        "user": user_json("ADMIN"),
        "accessToken": "at-login",
        "refreshToken": "rt-login",
        "tenant": tenant_json("t-a", "Transportes Andes"),
        "availableTenants": [
            tenant_json("t-a", "Transportes Andes"),
            tenant_json("t-b", "Logistica Sur"),
        ]
    })
}

/// Install a fmt subscriber once so `RUST_LOG=debug cargo test` shows the
/// pipeline's tracing output. Safe to call from every test.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).try_init().ok();
}

pub struct Harness {
    pub manager: Arc<SessionManager>,
    pub transport: Arc<MockTransport>,
    pub navigator: Arc<RecordingNavigator>,
    pub storage: Arc<MemoryStorage>,
}

fn build(storage: Arc<MemoryStorage>) -> Harness {
    let transport = MockTransport::new();
    let navigator = Arc::new(RecordingNavigator::new());
    let manager = Arc::new(SessionManager::new(
        storage.clone(),
        transport.clone(),
        navigator.clone(),
    ));
    Harness { manager, transport, navigator, storage }
}

/// No persisted session: the manager starts unauthenticated.
pub fn fresh() -> Harness {
    build(Arc::new(MemoryStorage::new()))
}

pub fn seed_session(storage: &MemoryStorage, role: &str) {
    storage.set(keys::ACCESS_TOKEN, "at-0");
    storage.set(keys::REFRESH_TOKEN, "rt-0");
    storage.set(keys::USER, &user_json(role).to_string());
    storage.set(
        keys::CURRENT_TENANT,
        &tenant_json("t-a", "Transportes Andes").to_string(),
    );
    storage.set(
        keys::AVAILABLE_TENANTS,
        &serde_json::json!([
            tenant_json("t-a", "Transportes Andes"),
            tenant_json("t-b", "Logistica Sur"),
        ])
        .to_string(),
    );
}

/// Storage pre-seeded with a persisted admin session; the manager rehydrates
/// into the authenticated state.
pub fn authenticated() -> Harness {
    authenticated_as("ADMIN")
}

pub fn authenticated_as(role: &str) -> Harness {
    let storage = Arc::new(MemoryStorage::new());
    seed_session(&storage, role);
    build(storage)
}
