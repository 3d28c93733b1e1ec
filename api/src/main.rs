// ============================================================================
// NOTES SERVICE
// ============================================================================

// - Post CRUD over JSON and multipart
// - Image uploads with orphan cleanup on delete
// - Memory, JSON snapshot or SQLite persistence
// - Static serving of uploads and client assets
// - Structured logging

use notes_api::{app, build_state, config::Config};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    if let Err(err) = run().await {
        error!("Fatal: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let state = build_state(&config).await?;
    let app = app(state, &config.public_dir, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;

    info!("Server running on http://{}", config.addr);
    info!("Store backend: {:?}", config.backend);
    info!("API Endpoints:");
    info!("  GET    /health           - Health check");
    info!("  GET    /api/posts        - List posts (newest first)");
    info!("  POST   /api/posts        - Create post (JSON or multipart)");
    info!("  PUT    /api/posts/{{id}}   - Edit post content");
    info!("  DELETE /api/posts/{{id}}   - Delete post and its images");

    axum::serve(listener, app).await?;
    Ok(())
}
