use classifieds_client::infra::config::ClientConfig;
use classifieds_client::infra::http::ApiClient;

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight\n\
         \n\
         Requires env vars:\n\
           API_URL\n\
         Optional:\n\
           API_FALLBACK_URL, SOCKET_URL, HEALTH_TIMEOUT_MS, REQUEST_TIMEOUT_SECS\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }

    // Force-read config (nice error messages if missing)
    let config = ClientConfig::from_env()?;

    println!("> Preflight:");
    println!("  API_URL={}", config.api_url);
    println!(
        "  API_FALLBACK_URL={}",
        config.api_fallback_url.as_deref().unwrap_or("(none)")
    );
    println!("  SOCKET_URL={}", config.socket_url.as_deref().unwrap_or("(none)"));
    println!("  HEALTH_TIMEOUT_MS={}", config.health_timeout.as_millis());

    let client = ApiClient::new(&config)?;
    let mut reachable = 0;
    for endpoint in config.endpoints() {
        let url = format!("{}/health", endpoint);
        match client.probe(&url, config.health_timeout).await {
            Ok(status) if status.is_success() => {
                reachable += 1;
                println!("  {} -> {} (ok)", url, status);
            }
            Ok(status) => println!("  {} -> {} (unhealthy)", url, status),
            Err(e) => println!("  {} -> unreachable ({})", url, e),
        }
    }

    if reachable == 0 {
        return Err(anyhow::anyhow!("no configured endpoint answered the health probe"));
    }
    println!("> Preflight OK.");
    Ok(())
}
