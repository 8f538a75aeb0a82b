use std::collections::{HashMap, hash_map::Entry};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use time::UtcOffset;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::stremio::{self, CatalogEntry};
use crate::tvmaze::{Show, TvMazeClient};
use crate::window::RecencyWindow;

#[derive(Debug, Clone)]
pub struct CatalogOptions {
    pub country: String,
    pub window_days: u32,
    pub utc_offset: UtcOffset,
    pub cache_ttl: Duration,
    pub excluded_types: Vec<String>,
}

impl CatalogOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            country: config.country.clone(),
            window_days: config.window_days,
            utc_offset: config.utc_offset,
            cache_ttl: config.cache_ttl,
            excluded_types: config.excluded_types.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CatalogStore {
    client: TvMazeClient,
    options: CatalogOptions,
    cache: Arc<RwLock<Option<CachedCatalog>>>,
    // Held by whichever task is currently rebuilding, so concurrent requests
    // never fan out into parallel rebuilds.
    build_permit: Arc<Mutex<()>>,
}

#[derive(Debug)]
struct CachedCatalog {
    built_at: Instant,
    entries: Arc<Vec<CatalogEntry>>,
}

impl CatalogStore {
    pub fn new(client: TvMazeClient, options: CatalogOptions) -> Self {
        Self {
            client,
            options,
            cache: Arc::new(RwLock::new(None)),
            build_permit: Arc::new(Mutex::new(())),
        }
    }

    // Fresh data is returned as-is, stale data is served while a background
    // rebuild refreshes it, and only a cold store blocks on the first build.
    pub async fn entries(&self) -> Arc<Vec<CatalogEntry>> {
        let snapshot = {
            let guard = self.cache.read().await;
            guard
                .as_ref()
                .map(|cache| (cache.built_at.elapsed(), cache.entries.clone()))
        };

        match snapshot {
            Some((age, entries)) if age < self.options.cache_ttl => entries,
            Some((age, entries)) => {
                debug!(
                    age_secs = age.as_secs(),
                    "catalog cache is stale; serving it while rebuilding"
                );
                self.spawn_background_rebuild();
                entries
            }
            None => self.build_blocking().await,
        }
    }

    pub async fn warm(&self) -> Result<usize, CatalogError> {
        let _permit = self.build_permit.clone().lock_owned().await;
        let entries = self.rebuild().await?;
        Ok(entries.len())
    }

    fn spawn_background_rebuild(&self) {
        let Ok(permit) = self.build_permit.clone().try_lock_owned() else {
            debug!("catalog rebuild already in flight");
            return;
        };

        let store = self.clone();
        tokio::spawn(async move {
            let _permit = permit;
            if let Err(error) = store.rebuild().await {
                warn!(
                    error = %error,
                    "background catalog rebuild failed; keeping previous snapshot"
                );
            }
        });
    }

    async fn build_blocking(&self) -> Arc<Vec<CatalogEntry>> {
        let _permit = self.build_permit.clone().lock_owned().await;

        // Another request may have finished the build while we waited.
        {
            let guard = self.cache.read().await;
            if let Some(cache) = guard.as_ref()
                && cache.built_at.elapsed() < self.options.cache_ttl
            {
                return cache.entries.clone();
            }
        }

        match self.rebuild().await {
            Ok(entries) => entries,
            Err(error) => {
                warn!(error = %error, "catalog build failed; serving the last known snapshot");
                let guard = self.cache.read().await;
                guard
                    .as_ref()
                    .map(|cache| cache.entries.clone())
                    .unwrap_or_default()
            }
        }
    }

    async fn rebuild(&self) -> Result<Arc<Vec<CatalogEntry>>, CatalogError> {
        let window = RecencyWindow::current(self.options.window_days, self.options.utc_offset);
        let entries = Arc::new(build_catalog(&self.client, &self.options, &window).await?);

        {
            let mut guard = self.cache.write().await;
            *guard = Some(CachedCatalog {
                built_at: Instant::now(),
                entries: entries.clone(),
            });
        }

        info!(
            entries = entries.len(),
            window_days = window.len(),
            "rebuilt recent-episodes catalog"
        );

        Ok(entries)
    }
}

pub async fn build_catalog(
    client: &TvMazeClient,
    options: &CatalogOptions,
    window: &RecencyWindow,
) -> Result<Vec<CatalogEntry>, CatalogError> {
    let mut days = JoinSet::new();
    for date in window.dates() {
        let client = client.clone();
        let country = options.country.clone();
        let date = date.clone();
        days.spawn(async move {
            let result = client.daily_schedule(&country, &date).await;
            (date, result)
        });
    }

    let mut shows: HashMap<i64, CatalogEntry> = HashMap::new();
    let mut fetched_days = 0usize;

    while let Some(joined) = days.join_next().await {
        let (date, result) = match joined {
            Ok(output) => output,
            Err(error) => {
                warn!(error = %error, "schedule fetch task failed to join");
                continue;
            }
        };

        let schedule = match result {
            Ok(schedule) => schedule,
            Err(error) => {
                warn!(
                    date = %date,
                    error = %error,
                    "failed to fetch daily schedule; skipping day"
                );
                continue;
            }
        };

        fetched_days += 1;

        for entry in schedule {
            let Some(airdate) = entry.air_date().map(str::to_owned) else {
                continue;
            };
            if !window.contains(Some(airdate.as_str())) {
                continue;
            }

            let Some(show) = entry.show else { continue };
            if show.show_type.as_deref().is_some_and(|kind| {
                options.excluded_types.iter().any(|excluded| excluded == kind)
            }) {
                continue;
            }

            upsert_entry(&mut shows, &show, &airdate);
        }
    }

    if fetched_days == 0 {
        return Err(CatalogError::Unavailable {
            days: window.len(),
        });
    }

    let mut entries: Vec<CatalogEntry> = shows.into_values().collect();
    entries.sort_by(|a, b| {
        b.latest_airdate
            .cmp(&a.latest_airdate)
            .then_with(|| a.id.cmp(&b.id))
    });

    Ok(entries)
}

fn upsert_entry(shows: &mut HashMap<i64, CatalogEntry>, show: &Show, airdate: &str) {
    match shows.entry(show.id) {
        Entry::Occupied(mut slot) => {
            let current = slot.get_mut();
            // ISO date strings compare chronologically.
            if current.latest_airdate.as_deref() < Some(airdate) {
                current.latest_airdate = Some(airdate.to_owned());
            }
        }
        Entry::Vacant(slot) => {
            slot.insert(catalog_entry(show, airdate));
        }
    }
}

fn catalog_entry(show: &Show, airdate: &str) -> CatalogEntry {
    let poster = show
        .image
        .as_ref()
        .and_then(|image| image.medium_first())
        .unwrap_or(stremio::PLACEHOLDER_POSTER)
        .to_owned();

    let description = show
        .summary
        .as_deref()
        .map(stremio::strip_html)
        .unwrap_or_default();

    CatalogEntry {
        id: format!("{}{}", stremio::ID_PREFIX, show.id),
        media_type: stremio::SERIES_TYPE.to_owned(),
        name: show.name.clone(),
        poster,
        description,
        latest_airdate: Some(airdate.to_owned()),
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no schedule data could be fetched for any of the {days} days in the window")]
    Unavailable { days: usize },
}
