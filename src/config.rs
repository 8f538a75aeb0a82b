use std::{env, net::SocketAddr, time::Duration};

use anyhow::{Context, Result};
use reqwest::Url;
use time::UtcOffset;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub public_base_url: Option<Url>,
    pub tvmaze_base_url: Url,
    pub tvmaze_timeout: Duration,
    pub country: String,
    pub window_days: u32,
    pub utc_offset: UtcOffset,
    pub cache_ttl: Duration,
    pub retries: u32,
    pub retry_delay: Duration,
    pub excluded_types: Vec<String>,
    pub addon_name: String,
    pub addon_description: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let host = env::var("STREMAZE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("STREMAZE_PORT").unwrap_or_else(|_| "7171".to_string());
        let port = port
            .parse::<u16>()
            .context("STREMAZE_PORT must be a valid u16 integer")?;
        let listen_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .context("failed to parse socket address from STREMAZE_HOST and STREMAZE_PORT")?;

        let raw_base_url = env::var("STREMAZE_TVMAZE_BASE_URL")
            .unwrap_or_else(|_| "https://api.tvmaze.com/".to_string());
        let tvmaze_base_url = parse_root_url(&raw_base_url, "STREMAZE_TVMAZE_BASE_URL")?;

        let public_base_url = env::var("STREMAZE_PUBLIC_BASE_URL")
            .ok()
            .map(|value| Url::parse(&value).context("STREMAZE_PUBLIC_BASE_URL must be a valid URL"))
            .transpose()?;

        let timeout_secs = env::var("STREMAZE_TVMAZE_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(10);
        let tvmaze_timeout = Duration::from_secs(timeout_secs);

        let country = env::var("STREMAZE_COUNTRY").unwrap_or_else(|_| "US".to_string());

        let window_days = env::var("STREMAZE_WINDOW_DAYS")
            .ok()
            .and_then(|value| parse_window_days(&value))
            .unwrap_or(7);

        let offset_hours = env::var("STREMAZE_UTC_OFFSET_HOURS")
            .ok()
            .and_then(|value| value.parse::<i8>().ok())
            .unwrap_or(-8);
        let utc_offset = UtcOffset::from_hms(offset_hours, 0, 0)
            .context("STREMAZE_UTC_OFFSET_HOURS must be a whole-hour UTC offset")?;

        let cache_ttl_secs = env::var("STREMAZE_CACHE_TTL_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(10_800);
        let cache_ttl = Duration::from_secs(cache_ttl_secs);

        let retries = env::var("STREMAZE_RETRIES")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(2);

        let retry_delay_ms = env::var("STREMAZE_RETRY_DELAY_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(200);
        let retry_delay = Duration::from_millis(retry_delay_ms);

        let excluded_types = env::var("STREMAZE_EXCLUDED_TYPES")
            .map(|value| parse_excluded_types(&value))
            .unwrap_or_else(|_| vec!["Talk Show".to_string(), "News".to_string()]);

        let addon_name = env::var("STREMAZE_TITLE")
            .unwrap_or_else(|_| "Recent Episodes (TVmaze)".to_string());
        let addon_description = env::var("STREMAZE_DESCRIPTION")
            .ok()
            .filter(|value| !value.trim().is_empty());

        Ok(Self {
            listen_addr,
            public_base_url,
            tvmaze_base_url,
            tvmaze_timeout,
            country,
            window_days,
            utc_offset,
            cache_ttl,
            retries,
            retry_delay,
            excluded_types,
            addon_name,
            addon_description,
        })
    }
}

fn parse_root_url(value: &str, label: &str) -> Result<Url> {
    let mut normalized = value.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Url::parse(&normalized).with_context(|| format!("{label} must be a valid URL"))
}

// Each window day costs one schedule request per rebuild, so the window also
// caps the rebuild fan-out.
fn parse_window_days(value: &str) -> Option<u32> {
    value
        .parse::<u32>()
        .ok()
        .filter(|days| *days > 0)
        .map(|days| days.min(30))
}

fn parse_excluded_types(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|kind| !kind.is_empty())
        .map(str::to_owned)
        .collect()
}
