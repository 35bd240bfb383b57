use std::sync::Arc;

use anyhow::Context;
use common::FilesystemMediaStore;
use server::config::AppConfig;
use server::state::AppState;
use server::{build_router, database, seed};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::load().context("Failed to load config")?;

    let db = database::init_db(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    info!("Database connected, schema synced");

    seed::ensure_indexes(&db)
        .await
        .context("Failed to create indexes")?;
    seed::ensure_constraints(&db)
        .await
        .context("Failed to create constraints")?;
    seed::load_fixtures(&db, &config.seed)
        .await
        .context("Failed to load fixtures")?;

    let media = FilesystemMediaStore::new(config.media.root.clone(), config.media.max_image_bytes)
        .await
        .context("Failed to initialize media store")?;
    info!(root = %config.media.root.display(), "Media store ready");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        db,
        config,
        media: Arc::new(media),
        image_gate: Default::default(),
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
