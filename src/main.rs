//! Demo client: resolves an endpoint, restores (or opens) a session, then browses
//! and fuzzy-searches listings.
//!
//! Usage: `cargo run -- [search terms]`
//! Optional env: DEMO_EMAIL / DEMO_PASSWORD to log in when no session can be restored.

use classifieds_client::app::listings::{listing_index, DEFAULT_PER_PAGE};
use classifieds_client::domain::listing::ListingFilters;
use classifieds_client::domain::user::Credentials;
use classifieds_client::{
    ApiClient, ClientConfig, HttpAuthApi, ListingsService, ServerStatusManager, SessionGuard,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("classifieds_client=info")),
        )
        .with_target(false)
        .init();

    let config = ClientConfig::from_env()?;
    let client = Arc::new(ApiClient::new(&config)?);

    let status = ServerStatusManager::new(client.clone(), &config).resolve().await;
    println!("> Server status: {:?}", status);
    if !status.is_online() {
        eprintln!("> No endpoint answered the health probe; requests will target {}", config.api_url);
    }

    let session = SessionGuard::new(Arc::new(HttpAuthApi::new(client.clone())), config.login_path.clone());
    if session.try_restore_session(false).await {
        println!("> Session restored");
    } else if let (Ok(email), Ok(password)) = (std::env::var("DEMO_EMAIL"), std::env::var("DEMO_PASSWORD")) {
        let user = session.login(&Credentials { email, password }).await?;
        println!("> Logged in as {} ({:?})", user.name, user.role);
    } else {
        println!("> Browsing anonymously");
    }

    let listings = ListingsService::new(client.clone(), session.clone());
    let page = listings.list(&ListingFilters::default(), 1, DEFAULT_PER_PAGE).await?;
    println!("> {} listings (page 1 of {} total)", page.items.len(), page.total);
    for listing in &page.items {
        println!("  [{}] {} - {} {}", listing.id, listing.title, listing.price, listing.currency);
    }

    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if !query.is_empty() {
        let index = listing_index(page.items)?;
        let hits = index.search(&query);
        println!("> Local fuzzy search for {:?}: {} hit(s)", query, hits.len());
        for hit in hits {
            println!("  {:.3}  {}", hit.score, hit.item.title);
        }
    }

    Ok(())
}
