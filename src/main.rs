// ABOUTME: Entry point for the billboard binary.
// ABOUTME: Loads .env and config, opens the SQLite store, serves the API, and flushes on shutdown.

use std::sync::Arc;

use billboard_core::{DisabledUploader, DocumentStore, ImageUploader};
use billboard_server::{AppState, BillboardConfig, CloudinaryUploader, create_router};
use billboard_store::SqliteStore;

const DEFAULT_LOG_FILTER: &str = "billboard=debug,billboard_server=debug,billboard_core=debug,\
                                  billboard_store=debug,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real environment variables take precedence.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let config = BillboardConfig::from_env()?;

    let store = Arc::new(SqliteStore::open(&config.db_path)?);
    tracing::info!("opened store at {}", config.db_path.display());

    let uploader: Arc<dyn ImageUploader> = match config.cloudinary.clone() {
        Some(cloudinary) => {
            tracing::info!("uploading images to cloud {}", cloudinary.cloud_name);
            Arc::new(CloudinaryUploader::new(cloudinary))
        }
        None => {
            tracing::warn!("Cloudinary not configured; announcement photos will be rejected");
            Arc::new(DisabledUploader)
        }
    };

    let state = Arc::new(AppState::new(store.clone(), uploader, config.txn_timeout));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!("billboard listening on {}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    store.shutdown().await?;
    tracing::info!("store flushed, exiting");
    Ok(())
}
