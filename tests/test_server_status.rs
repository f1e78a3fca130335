//! Endpoint selection: primary when healthy, fallback when the primary is down,
//! unhealthy or hangs past the probe timeout.

mod common;

use classifieds_client::transport::http::types::CallCounters;
use classifieds_client::{ApiClient, ClientConfig, ServerStatus, ServerStatusManager};
use common::spawn_server;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn config(primary: &str, fallback: &str) -> ClientConfig {
    ClientConfig {
        api_fallback_url: Some(fallback.to_string()),
        ..ClientConfig::for_endpoint(primary)
    }
}

/// An address nothing listens on.
async fn closed_addr() -> anyhow::Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{}", addr))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn healthy_primary_wins() -> anyhow::Result<()> {
    let primary = spawn_server().await?;
    let fallback = spawn_server().await?;
    let config = config(&primary.base_url, &fallback.base_url);
    let client = Arc::new(ApiClient::new(&config)?);
    let manager = ServerStatusManager::new(client.clone(), &config);

    let status = manager.resolve().await;
    assert_eq!(
        status,
        ServerStatus::Online {
            url: primary.base_url.clone(),
            fallback: false,
        }
    );
    assert_eq!(client.base_url(), primary.base_url);
    assert_eq!(CallCounters::get(&fallback.state.counters.health), 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unhealthy_primary_falls_back() -> anyhow::Result<()> {
    let primary = spawn_server().await?;
    let fallback = spawn_server().await?;
    primary.state.set_healthy(false);
    let config = config(&primary.base_url, &fallback.base_url);
    let client = Arc::new(ApiClient::new(&config)?);
    let manager = ServerStatusManager::new(client.clone(), &config);

    let status = manager.resolve().await;
    assert_eq!(
        status,
        ServerStatus::Online {
            url: fallback.base_url.clone(),
            fallback: true,
        }
    );
    assert_eq!(client.base_url(), fallback.base_url);

    // Cached: no further probes until invalidated.
    manager.resolve().await;
    assert_eq!(manager.probes_started(), 1);

    primary.state.set_healthy(true);
    manager.invalidate().await;
    assert_eq!(
        manager.resolve().await,
        ServerStatus::Online {
            url: primary.base_url.clone(),
            fallback: false,
        }
    );
    assert_eq!(manager.probes_started(), 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unreachable_primary_falls_back() -> anyhow::Result<()> {
    let primary = closed_addr().await?;
    let fallback = spawn_server().await?;
    let config = config(&primary, &fallback.base_url);
    let client = Arc::new(ApiClient::new(&config)?);

    let status = ServerStatusManager::new(client, &config).resolve().await;
    assert_eq!(
        status,
        ServerStatus::Online {
            url: fallback.base_url.clone(),
            fallback: true,
        }
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn hanging_primary_is_abandoned_after_the_timeout() -> anyhow::Result<()> {
    // Accepts connections and never answers.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let primary = format!("http://{}", listener.local_addr()?);
    let hang = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    let fallback = spawn_server().await?;

    let mut config = config(&primary, &fallback.base_url);
    config.health_timeout = Duration::from_millis(200);
    let client = Arc::new(ApiClient::new(&config)?);

    let started = Instant::now();
    let status = ServerStatusManager::new(client, &config).resolve().await;
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(
        status,
        ServerStatus::Online {
            url: fallback.base_url.clone(),
            fallback: true,
        }
    );
    hang.abort();
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn nothing_reachable_is_offline() -> anyhow::Result<()> {
    let primary = closed_addr().await?;
    let fallback = closed_addr().await?;
    let config = config(&primary, &fallback);
    let client = Arc::new(ApiClient::new(&config)?);

    let status = ServerStatusManager::new(client.clone(), &config).resolve().await;
    assert_eq!(status, ServerStatus::Offline);
    assert!(!status.is_online());
    assert_eq!(client.base_url(), primary);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_resolves_share_one_health_round() -> anyhow::Result<()> {
    let primary = spawn_server().await?;
    let config = ClientConfig::for_endpoint(primary.base_url.clone());
    let client = Arc::new(ApiClient::new(&config)?);
    let manager = ServerStatusManager::new(client, &config);

    let results = futures::future::join_all((0..8).map(|_| manager.resolve())).await;
    assert!(results.iter().all(ServerStatus::is_online));
    assert_eq!(manager.probes_started(), 1);
    assert_eq!(CallCounters::get(&primary.state.counters.health), 1);
    Ok(())
}

/// Answers every `/health` request with 200 after `delay`.
async fn slow_health(delay: Duration) -> anyhow::Result<String> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = format!("http://{}", listener.local_addr()?);
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                tokio::time::sleep(delay).await;
                let _ = stream
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                    .await;
            });
        }
    });
    Ok(addr)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn invalidate_during_a_health_round_is_not_lost() -> anyhow::Result<()> {
    let primary = slow_health(Duration::from_millis(300)).await?;
    let config = ClientConfig::for_endpoint(primary);
    let client = Arc::new(ApiClient::new(&config)?);
    let manager = ServerStatusManager::new(client, &config);

    let (status, _) = tokio::join!(manager.resolve(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        manager.invalidate().await;
    });
    assert!(status.is_online());
    assert_eq!(manager.probes_started(), 1);

    // The round that was overtaken by `invalidate()` did not repopulate the cache.
    assert!(manager.resolve().await.is_online());
    assert_eq!(manager.probes_started(), 2);

    manager.resolve().await;
    assert_eq!(manager.probes_started(), 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn resolve_after_invalidate_waits_for_a_fresh_round() -> anyhow::Result<()> {
    let primary = slow_health(Duration::from_millis(300)).await?;
    let config = ClientConfig::for_endpoint(primary);
    let client = Arc::new(ApiClient::new(&config)?);
    let manager = ServerStatusManager::new(client, &config);

    // The second caller arrives after the invalidation and must not settle for the
    // round that started before it.
    let (first, second) = tokio::join!(manager.resolve(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        manager.invalidate().await;
        manager.resolve().await
    });
    assert!(first.is_online());
    assert!(second.is_online());
    assert_eq!(manager.probes_started(), 2);

    manager.resolve().await;
    assert_eq!(manager.probes_started(), 2);
    Ok(())
}
