use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

use crate::catalog::{self, CatalogError, CatalogOptions};
use crate::config::AppConfig;
use crate::meta;
use crate::stremio::{self, CatalogResponse, MetaDetail, MetaResponse};
use crate::tvmaze::TvMazeClient;
use crate::window::RecencyWindow;

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub entries: usize,
    pub metas_written: usize,
    pub metas_skipped: usize,
}

pub async fn export_snapshot(
    client: &TvMazeClient,
    config: &AppConfig,
    out_dir: &Path,
) -> Result<ExportSummary, ExportError> {
    let options = CatalogOptions::from_config(config);
    let window = RecencyWindow::current(options.window_days, options.utc_offset);

    info!(
        days = window.len(),
        country = %options.country,
        out_dir = %out_dir.display(),
        "building catalog snapshot for export"
    );

    let entries = catalog::build_catalog(client, &options, &window).await?;

    let catalog_dir = out_dir.join("catalog").join("series");
    let meta_dir = out_dir.join("meta").join("series");
    for dir in [&catalog_dir, &meta_dir] {
        fs::create_dir_all(dir)
            .await
            .map_err(|source| ExportError::CreateDir {
                source,
                path: dir.clone(),
            })?;
    }

    write_json(
        &out_dir.join("manifest.json"),
        &stremio::build_manifest(config),
    )
    .await?;
    write_json(
        &catalog_dir.join(format!("{}.json", stremio::CATALOG_ID)),
        &CatalogResponse { metas: &entries },
    )
    .await?;

    let mut metas_written = 0usize;
    let mut metas_skipped = 0usize;

    // TVmaze rate-limits bursty clients, so metas are fetched one at a time.
    for entry in &entries {
        let Some(show_id) = meta::parse_meta_id(&entry.id) else {
            warn!(id = %entry.id, "catalog entry id is not a TVmaze id; skipping meta export");
            metas_skipped += 1;
            continue;
        };

        let mut episodes = match client.episodes(show_id).await {
            Ok(episodes) => episodes,
            Err(error) => {
                warn!(
                    show_id,
                    error = %error,
                    "failed to fetch episode list; skipping meta export for show"
                );
                metas_skipped += 1;
                continue;
            }
        };
        episodes.sort_by_key(|episode| (episode.season.unwrap_or(0), episode.number.unwrap_or(0)));

        let detail = MetaDetail {
            id: entry.id.clone(),
            media_type: entry.media_type.clone(),
            name: entry.name.clone(),
            poster: entry.poster.clone(),
            description: entry.description.clone(),
            episodes: meta::episode_entries(&entry.id, &episodes),
        };

        write_json(
            &meta_dir.join(format!("{}.json", entry.id)),
            &MetaResponse { meta: detail },
        )
        .await?;
        metas_written += 1;
    }

    info!(
        entries = entries.len(),
        metas_written, metas_skipped, "export complete"
    );

    Ok(ExportSummary {
        entries: entries.len(),
        metas_written,
        metas_skipped,
    })
}

async fn write_json<T: Serialize>(path: &Path, payload: &T) -> Result<(), ExportError> {
    let json = serde_json::to_vec_pretty(payload).map_err(|source| ExportError::Serialise {
        source,
        path: path.to_path_buf(),
    })?;

    fs::write(path, json)
        .await
        .map_err(|source| ExportError::Write {
            source,
            path: path.to_path_buf(),
        })?;

    Ok(())
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("failed to create export directory at {path}")]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to write export file at {path}")]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to serialise export payload for {path}")]
    Serialise {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },
}
