//! Primary/fallback endpoint selection driven by a `/health` probe.

use crate::app::single_flight::SingleFlight;
use crate::infra::config::ClientConfig;
use crate::infra::http::ApiClient;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    /// `url` answered the health probe.
    Online { url: String, fallback: bool },
    /// Nothing answered; requests keep going to the primary.
    Offline,
}

impl ServerStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, ServerStatus::Online { .. })
    }
}

pub struct ServerStatusManager {
    client: Arc<ApiClient>,
    endpoints: Vec<String>,
    timeout: Duration,
    cached: Arc<RwLock<Option<ServerStatus>>>,
    /// Bumped by `invalidate()`; a probe that started under an older epoch does not cache.
    epoch: Arc<AtomicU64>,
    probe: SingleFlight<(u64, ServerStatus)>,
}

impl ServerStatusManager {
    pub fn new(client: Arc<ApiClient>, config: &ClientConfig) -> Self {
        Self {
            client,
            endpoints: config.endpoints(),
            timeout: config.health_timeout,
            cached: Arc::new(RwLock::new(None)),
            epoch: Arc::new(AtomicU64::new(0)),
            probe: SingleFlight::new("health-probe"),
        }
    }

    /// Returns the cached status, probing the endpoints on first use.
    /// Concurrent callers share one probe round. A round overtaken by `invalidate()`
    /// is run once more so the caller sees a result from after the invalidation.
    pub async fn resolve(&self) -> ServerStatus {
        let mut status = ServerStatus::Offline;
        for _ in 0..2 {
            if let Some(status) = self.cached.read().await.clone() {
                return status;
            }
            let wanted = self.epoch.load(Ordering::SeqCst);
            let (epoch, probed) = self.probe_round().await;
            status = probed;
            if epoch >= wanted {
                break;
            }
        }
        status
    }

    async fn probe_round(&self) -> (u64, ServerStatus) {
        let client = self.client.clone();
        let endpoints = self.endpoints.clone();
        let timeout = self.timeout;
        let cached = self.cached.clone();
        let epoch = self.epoch.clone();
        self.probe
            .run(move || async move {
                let started = epoch.load(Ordering::SeqCst);
                let status = probe_endpoints(&client, &endpoints, timeout).await;
                match &status {
                    ServerStatus::Online { url, .. } => client.set_base_url(url),
                    ServerStatus::Offline => {
                        if let Some(primary) = endpoints.first() {
                            client.set_base_url(primary);
                        }
                    }
                }
                let mut slot = cached.write().await;
                if epoch.load(Ordering::SeqCst) == started {
                    *slot = Some(status.clone());
                } else {
                    tracing::debug!("status invalidated during probe; not caching");
                }
                (started, status)
            })
            .await
            .unwrap_or((0, ServerStatus::Offline))
    }

    /// Drops the cached result so the next `resolve()` probes again. A probe already in
    /// flight finishes but does not repopulate the cache.
    pub async fn invalidate(&self) {
        let mut slot = self.cached.write().await;
        self.epoch.fetch_add(1, Ordering::SeqCst);
        *slot = None;
    }

    pub fn probes_started(&self) -> u64 {
        self.probe.started()
    }
}

async fn probe_endpoints(client: &ApiClient, endpoints: &[String], timeout: Duration) -> ServerStatus {
    for (idx, base) in endpoints.iter().enumerate() {
        let url = format!("{}/health", base);
        match client.probe(&url, timeout).await {
            Ok(status) if status.is_success() => {
                tracing::info!(endpoint = %base, fallback = idx > 0, "endpoint healthy");
                return ServerStatus::Online {
                    url: base.clone(),
                    fallback: idx > 0,
                };
            }
            Ok(status) => {
                tracing::warn!(endpoint = %base, %status, "health probe returned non-success");
            }
            Err(e) => {
                tracing::warn!(endpoint = %base, error = %e, "health probe failed");
            }
        }
    }
    tracing::warn!("no endpoint answered the health probe");
    ServerStatus::Offline
}
