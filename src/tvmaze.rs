use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct TvMazeClient {
    http: Client,
    base_url: Url,
    retries: u32,
    retry_delay: Duration,
}

impl TvMazeClient {
    pub fn new(
        base_url: Url,
        timeout: Duration,
        retries: u32,
        retry_delay: Duration,
    ) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(format!("stremaze/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            retries,
            retry_delay,
        })
    }

    pub async fn daily_schedule(
        &self,
        country: &str,
        date: &str,
    ) -> Result<Vec<ScheduleEntry>, TvMazeError> {
        let mut url = self.base_url.join("schedule").map_err(TvMazeError::Url)?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("country", country);
            pairs.append_pair("date", date);
        }

        let entries: Vec<ScheduleEntry> = self.get_json(url).await?;

        debug!(
            country,
            date,
            entries = entries.len(),
            "TVmaze schedule response received"
        );

        Ok(entries)
    }

    pub async fn show(&self, show_id: i64) -> Result<Show, TvMazeError> {
        let url = self
            .base_url
            .join(&format!("shows/{show_id}"))
            .map_err(TvMazeError::Url)?;

        self.get_json(url).await
    }

    pub async fn episodes(&self, show_id: i64) -> Result<Vec<Episode>, TvMazeError> {
        let url = self
            .base_url
            .join(&format!("shows/{show_id}/episodes"))
            .map_err(TvMazeError::Url)?;

        let episodes: Vec<Episode> = self.get_json(url).await?;

        debug!(
            show_id,
            episodes = episodes.len(),
            "TVmaze episode list response received"
        );

        Ok(episodes)
    }

    pub async fn show_index(&self, page: u32) -> Result<Vec<Show>, TvMazeError> {
        let mut url = self.base_url.join("shows").map_err(TvMazeError::Url)?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("page", &page.to_string());
        }

        // TVmaze answers past-the-end index pages with a 404.
        match self.get_json(url).await {
            Ok(shows) => Ok(shows),
            Err(TvMazeError::NotFound) => Ok(Vec::new()),
            Err(error) => Err(error),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, TvMazeError> {
        let mut attempt = 0u32;

        loop {
            match self.try_get(url.clone()).await {
                Ok(value) => return Ok(value),
                Err(TvMazeError::NotFound) => return Err(TvMazeError::NotFound),
                Err(error) if attempt < self.retries => {
                    attempt += 1;
                    debug!(
                        url = %url,
                        attempt,
                        retries = self.retries,
                        error = %error,
                        "retrying TVmaze request after transient failure"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn try_get<T: DeserializeOwned>(&self, url: Url) -> Result<T, TvMazeError> {
        let response = self.http.get(url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(TvMazeError::NotFound);
        }

        let payload = response.error_for_status()?.json().await?;
        Ok(payload)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleEntry {
    #[serde(default)]
    pub airdate: Option<String>,
    #[serde(default)]
    pub show: Option<Show>,
}

impl ScheduleEntry {
    pub fn air_date(&self) -> Option<&str> {
        self.airdate.as_deref().filter(|date| !date.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Show {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    #[serde(default)]
    pub show_type: Option<String>,
    #[serde(default)]
    pub image: Option<Image>,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Image {
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub original: Option<String>,
}

impl Image {
    pub fn medium_first(&self) -> Option<&str> {
        self.medium.as_deref().or(self.original.as_deref())
    }

    pub fn original_first(&self) -> Option<&str> {
        self.original.as_deref().or(self.medium.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Episode {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub season: Option<u32>,
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub airdate: Option<String>,
    #[serde(default)]
    pub image: Option<Image>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl Episode {
    pub fn air_date(&self) -> Option<&str> {
        self.airdate.as_deref().filter(|date| !date.is_empty())
    }
}

#[derive(Debug, Error)]
pub enum TvMazeError {
    #[error("failed to build TVmaze request url")]
    Url(#[from] url::ParseError),
    #[error("http error when querying the TVmaze api")]
    Http(#[from] reqwest::Error),
    #[error("TVmaze resource not found")]
    NotFound,
}
