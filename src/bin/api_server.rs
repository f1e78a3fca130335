// src/bin/api_server.rs

use classifieds_client::transport;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("api_server=info,classifieds_client=info")),
        )
        .init();

    // --- Store Initialization ---
    tracing::info!("seeding in-memory marketplace store");
    let app_state = transport::http::AppState::seeded();

    // --- API Server Initialization ---
    let addr = std::env::var("API_SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);
    let app = transport::http::create_router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", transport::http::ApiDoc::openapi()))
        .layer(cors);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "mock marketplace API listening");
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);
    tracing::info!("demo logins: amira@example.com / dealer@example.com / admin@example.com (password123)");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    Ok(())
}
