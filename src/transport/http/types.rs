use crate::transport::http::store::MockStore;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use utoipa::ToSchema;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<MockStore>>,
    pub counters: Arc<CallCounters>,
    /// `/health` answers 503 while false.
    pub healthy: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(store: MockStore) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            counters: Arc::new(CallCounters::default()),
            healthy: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn seeded() -> Self {
        Self::new(MockStore::seeded())
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Invalidates every issued session token; refresh tokens stay valid.
    pub async fn expire_sessions(&self) {
        self.store.write().await.sessions.clear();
    }

    /// Invalidates every refresh token.
    pub async fn revoke_refresh_tokens(&self) {
        self.store.write().await.refresh_tokens.clear();
    }
}

/// How often each auth endpoint was hit.
#[derive(Default, Debug)]
pub struct CallCounters {
    pub health: AtomicU64,
    pub me: AtomicU64,
    pub refresh: AtomicU64,
    pub logout: AtomicU64,
    pub login: AtomicU64,
}

impl CallCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub data: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct SendMessageRequest {
    pub body: String,
}

/// Wire shape of a settings update: one domain and the fields that change in it.
#[derive(Deserialize, Debug, ToSchema)]
pub struct SettingsUpdateRequest {
    /// `preferences`, `security`, `notifications` or `privacy`
    pub domain: String,
    #[schema(value_type = Object)]
    pub changes: JsonValue,
}

#[derive(Deserialize, Debug)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}
