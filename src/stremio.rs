use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::config::AppConfig;

pub const MANIFEST_ID: &str = "recent.tvmaze";
pub const ID_PREFIX: &str = "tvmaze:";
pub const CATALOG_ID: &str = "recent";
pub const SERIES_TYPE: &str = "series";
pub const EPISODE_TYPE: &str = "episode";
pub const PLACEHOLDER_POSTER: &str = "https://static.strem.io/assets/placeholders/series.png";

#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub id: String,
    pub version: String,
    pub name: String,
    pub description: String,
    pub types: Vec<String>,
    pub resources: Vec<String>,
    pub catalogs: Vec<CatalogDefinition>,
    #[serde(rename = "idPrefixes")]
    pub id_prefixes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub name: String,
    pub poster: String,
    pub description: String,
    #[serde(rename = "latestAirdate")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_airdate: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetaDetail {
    pub id: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub name: String,
    pub poster: String,
    pub description: String,
    pub episodes: Vec<EpisodeEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EpisodeEntry {
    pub id: String,
    pub series: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub season: u32,
    pub episode: u32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub released: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse<'a> {
    pub metas: &'a [CatalogEntry],
}

#[derive(Debug, Serialize)]
pub struct MetaResponse {
    pub meta: MetaDetail,
}

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

pub fn strip_html(raw: &str) -> String {
    TAG_PATTERN.replace_all(raw, "").trim().to_string()
}

pub fn build_manifest(config: &AppConfig) -> Manifest {
    let endpoint = config
        .public_base_url
        .clone()
        .or_else(|| Url::parse(&format!("http://{}/", config.listen_addr)).ok())
        .and_then(|base| base.join("api").ok())
        .map(|url| url.to_string());

    let description = config.addon_description.clone().unwrap_or_else(|| {
        format!(
            "Shows with episodes that aired on TVmaze in the last {} days",
            config.window_days
        )
    });

    Manifest {
        id: MANIFEST_ID.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        name: config.addon_name.clone(),
        description,
        types: vec![SERIES_TYPE.to_string()],
        resources: vec!["catalog".to_string(), "meta".to_string()],
        catalogs: vec![CatalogDefinition {
            id: CATALOG_ID.to_string(),
            media_type: SERIES_TYPE.to_string(),
            name: format!("Recent Episodes ({} days)", config.window_days),
        }],
        id_prefixes: vec![ID_PREFIX.to_string()],
        endpoint,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_html_removes_tags_and_trims() {
        assert_eq!(
            strip_html("<p>A <b>bold</b> finale.</p>\n"),
            "A bold finale."
        );
        assert_eq!(strip_html("no markup"), "no markup");
        assert_eq!(strip_html("<p></p>"), "");
    }

    #[test]
    fn strip_html_handles_unclosed_and_nested_tags() {
        assert_eq!(strip_html("<div><p>inner"), "inner");
        assert_eq!(strip_html("a <br/> b"), "a  b");
    }

    #[test]
    fn catalog_entry_serialises_with_wire_field_names() {
        let entry = CatalogEntry {
            id: "tvmaze:7".to_string(),
            media_type: SERIES_TYPE.to_string(),
            name: "Midnight Sun".to_string(),
            poster: PLACEHOLDER_POSTER.to_string(),
            description: String::new(),
            latest_airdate: Some("2024-05-07".to_string()),
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "series");
        assert_eq!(value["latestAirdate"], "2024-05-07");
        assert!(value.get("media_type").is_none());
    }

    #[test]
    fn absent_optional_fields_are_omitted() {
        let episode = EpisodeEntry {
            id: "tvmaze:7:s1e2".to_string(),
            series: "tvmaze:7".to_string(),
            media_type: EPISODE_TYPE.to_string(),
            season: 1,
            episode: 2,
            name: "Pilot, Part 2".to_string(),
            released: None,
            thumbnail: None,
            overview: None,
        };

        let value = serde_json::to_value(&episode).unwrap();
        assert!(value.get("released").is_none());
        assert!(value.get("thumbnail").is_none());
        assert!(value.get("overview").is_none());
    }
}
