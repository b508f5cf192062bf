use anyhow::Context;
use fabric::{api::build_router, logging::init_tracing, open_store, Config, Fabric, Query};
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config_path = std::env::var("FABRIC_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("fabric.toml"));
    let config = Config::load(Some(&config_path))
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    init_tracing(&config.logging);

    let store = open_store(&config.store)
        .await
        .context("failed to open store")?;
    let fabric = Fabric::new(store);

    let count = fabric
        .count(Query::new())
        .await
        .context("failed to fetch count")?;
    info!("There are {} triples in the {} store", count, fabric.backend());

    let app = build_router(fabric, config.server.body_limit);
    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("failed to listen for ctrl-c, shutting down");
    }
}
