use std::path::PathBuf;

use anyhow::Context;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use stremaze::config::AppConfig;
use stremaze::export;
use stremaze::tvmaze::TvMazeClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    let out_dir = std::env::var("STREMAZE_EXPORT_DIR").unwrap_or_else(|_| "public".to_string());
    let out_dir = PathBuf::from(out_dir);

    let tvmaze = TvMazeClient::new(
        config.tvmaze_base_url.clone(),
        config.tvmaze_timeout,
        config.retries,
        config.retry_delay,
    )
    .context("failed to construct TVmaze client")?;

    let summary = export::export_snapshot(&tvmaze, &config, &out_dir)
        .await
        .context("failed to export static addon snapshot")?;

    tracing::info!(
        entries = summary.entries,
        metas_written = summary.metas_written,
        metas_skipped = summary.metas_skipped,
        out_dir = %out_dir.display(),
        "static snapshot exported"
    );

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().without_time())
        .init();
}
