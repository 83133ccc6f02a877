//! FoldZip - Folder Archive Service
//!
//! Entry point: loads configuration, builds the shared S3 client and serves
//! the download route.

use anyhow::Result;
use foldzip_domain::archive::ArchiveService;
use foldzip_s3::S3ObjectSource;
use foldzip_server::{config::ServerConfig, routes, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables first so RUST_LOG may come from .env
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting FoldZip archive service");

    let config = ServerConfig::from_env()?;

    info!(
        bucket = %config.bucket,
        endpoint = ?config.endpoint,
        listing_mode = ?config.listing_mode,
        "Initializing S3 object source"
    );

    // One client for the whole process, shared by every download
    let s3_client = config.s3_client().await;
    let source = S3ObjectSource::new(s3_client, config.bucket.clone())
        .with_listing_mode(config.listing_mode);

    let state = AppState::new(ArchiveService::new(source), config.stream_buffer);

    // Build HTTP router
    let app = routes::create_router(state);

    let addr = config.bind_addr();
    info!(addr = %addr, "Starting HTTP server");

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
