//! A single-user notes service: short text posts with up to nine images,
//! an HTTP API over interchangeable post stores, and the headless client
//! state (PIN gate, composer, feed) that drives the browser UI.

pub mod client;
pub mod config;
pub mod dto;
pub mod errors;
pub mod models;
pub mod routes;
pub mod service;
pub mod states;
pub mod store;
pub mod uploads;

use std::{path::Path, sync::Arc};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, put},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub use states::AppState;

use config::{Config, StoreBackend};
use service::PostService;
use store::{FileStore, MemoryStore, PostStore, SqliteStore, StoreError};
use uploads::{PUBLIC_PREFIX, UploadStorage};

/// Opens the configured store backend.
pub async fn open_store(config: &Config) -> Result<Arc<dyn PostStore>, StoreError> {
    let store: Arc<dyn PostStore> = match config.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::File => Arc::new(FileStore::open(config.snapshot_path()).await?),
        StoreBackend::Sqlite => Arc::new(SqliteStore::connect(&config.database_url).await?),
    };
    Ok(store)
}

/// Builds the state for `config`: store backend plus upload storage.
pub async fn build_state(config: &Config) -> Result<AppState, StoreError> {
    std::fs::create_dir_all(&config.data_dir)?;
    let store = open_store(config).await?;
    let uploads = UploadStorage::new(&config.upload_dir)?;
    Ok(AppState::new(PostService::new(store, Arc::new(uploads))))
}

/// The full application: JSON API, uploaded images under `/uploads`, and the
/// client assets in `public_dir` for everything else.
pub fn app(state: AppState, public_dir: &Path, max_upload_bytes: usize) -> Router {
    let upload_root = state.posts.uploads().root().to_path_buf();

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health_check))
        .route(
            "/api/posts",
            get(routes::list_posts).post(routes::create_post),
        )
        .route(
            "/api/posts/{id}",
            put(routes::update_post).delete(routes::delete_post),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .nest_service(PUBLIC_PREFIX, ServeDir::new(upload_root))
        .fallback_service(ServeDir::new(public_dir))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}
