#![allow(dead_code)]

use classifieds_client::domain::user::{Credentials, User};
use classifieds_client::transport::http::{create_router, AppState};
use classifieds_client::{ApiClient, ClientConfig, HttpAuthApi, SessionGuard};
use std::sync::Arc;
use tokio::task::JoinHandle;

pub const PASSWORD: &str = "password123";
pub const BUYER: &str = "amira@example.com";
pub const DEALER: &str = "dealer@example.com";

/// Seeded mock API on an ephemeral port; aborted on drop.
pub struct TestServer {
    pub state: AppState,
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn_server() -> anyhow::Result<TestServer> {
    let state = AppState::seeded();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let router = create_router(state.clone());
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(TestServer {
        state,
        base_url: format!("http://{}", addr),
        handle,
    })
}

/// One client "tab": its own cookie jar, auth API and session guard.
pub struct Harness {
    pub config: ClientConfig,
    pub client: Arc<ApiClient>,
    pub auth: Arc<HttpAuthApi>,
    pub session: SessionGuard,
}

pub fn harness(server: &TestServer) -> anyhow::Result<Harness> {
    let config = ClientConfig::for_endpoint(server.base_url.clone());
    let client = Arc::new(ApiClient::new(&config)?);
    let auth = Arc::new(HttpAuthApi::new(client.clone()));
    let session = SessionGuard::new(auth.clone(), config.login_path.clone());
    Ok(Harness {
        config,
        client,
        auth,
        session,
    })
}

pub async fn login(h: &Harness, email: &str) -> anyhow::Result<User> {
    let user = h
        .session
        .login(&Credentials {
            email: email.to_string(),
            password: PASSWORD.to_string(),
        })
        .await?;
    Ok(user)
}
