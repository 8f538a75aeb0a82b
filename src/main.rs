use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use stremaze::catalog::{CatalogOptions, CatalogStore};
use stremaze::config::AppConfig;
use stremaze::tvmaze::TvMazeClient;
use stremaze::{AppState, http};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    let listen_addr = config.listen_addr;

    let tvmaze = TvMazeClient::new(
        config.tvmaze_base_url.clone(),
        config.tvmaze_timeout,
        config.retries,
        config.retry_delay,
    )
    .context("failed to construct TVmaze client")?;

    let catalog = CatalogStore::new(tvmaze.clone(), CatalogOptions::from_config(&config));

    match catalog.warm().await {
        Ok(entries) => tracing::info!(entries, "catalog warmed before serving"),
        Err(error) => tracing::warn!(
            error = %error,
            "initial catalog build failed; the first catalog request will retry"
        ),
    }

    let state = Arc::new(AppState {
        config,
        tvmaze,
        catalog,
    });
    let app = http::router(state);

    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind listener on {listen_addr}"))?;

    tracing::info!("listening for addon requests on {}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service())
        .await
        .context("server terminated unexpectedly")?;

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().without_time())
        .init();
}
