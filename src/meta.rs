use tracing::{debug, warn};

use crate::stremio::{self, EpisodeEntry, MetaDetail};
use crate::tvmaze::{Episode, Show, TvMazeClient, TvMazeError};

pub fn parse_meta_id(meta_id: &str) -> Option<i64> {
    meta_id.strip_prefix(stremio::ID_PREFIX)?.parse().ok()
}

pub async fn build_meta(client: &TvMazeClient, meta_id: &str) -> MetaDetail {
    let Some(show_id) = parse_meta_id(meta_id) else {
        debug!(meta_id, "meta id does not name a TVmaze show");
        return assemble(meta_id, None, Vec::new());
    };

    let (show, episodes) = tokio::join!(client.show(show_id), client.episodes(show_id));

    let show = match show {
        Ok(show) => Some(show),
        Err(TvMazeError::NotFound) => {
            debug!(show_id, "TVmaze has no show record for this id");
            None
        }
        Err(error) => {
            warn!(
                show_id,
                error = %error,
                "failed to fetch show; serving placeholder meta"
            );
            None
        }
    };

    let episodes = match episodes {
        Ok(episodes) => episodes,
        Err(error) => {
            warn!(
                show_id,
                error = %error,
                "failed to fetch episode list; serving it empty"
            );
            Vec::new()
        }
    };

    assemble(meta_id, show, episodes)
}

fn assemble(meta_id: &str, show: Option<Show>, mut episodes: Vec<Episode>) -> MetaDetail {
    episodes.sort_by_key(|episode| (episode.season.unwrap_or(0), episode.number.unwrap_or(0)));

    let poster = show
        .as_ref()
        .and_then(|show| show.image.as_ref())
        .and_then(|image| image.original_first())
        .or_else(|| {
            episodes
                .first()
                .and_then(|episode| episode.image.as_ref())
                .and_then(|image| image.original_first())
        })
        .unwrap_or(stremio::PLACEHOLDER_POSTER)
        .to_owned();

    let name = show
        .as_ref()
        .map(|show| show.name.clone())
        .unwrap_or_else(|| "Unknown Show".to_owned());

    let description = show
        .as_ref()
        .and_then(|show| show.summary.as_deref())
        .map(stremio::strip_html)
        .unwrap_or_default();

    MetaDetail {
        id: meta_id.to_owned(),
        media_type: stremio::SERIES_TYPE.to_owned(),
        name,
        poster,
        description,
        episodes: episode_entries(meta_id, &episodes),
    }
}

pub fn episode_entries(meta_id: &str, episodes: &[Episode]) -> Vec<EpisodeEntry> {
    episodes
        .iter()
        .map(|episode| {
            let season = episode.season.unwrap_or(0);
            let number = episode.number.unwrap_or(0);

            let overview = episode
                .summary
                .as_deref()
                .map(stremio::strip_html)
                .filter(|text| !text.is_empty());

            EpisodeEntry {
                id: format!("{meta_id}:s{season}e{number}"),
                series: meta_id.to_owned(),
                media_type: stremio::EPISODE_TYPE.to_owned(),
                season,
                episode: number,
                name: episode.name.clone(),
                released: episode.air_date().map(str::to_owned),
                thumbnail: episode
                    .image
                    .as_ref()
                    .and_then(|image| image.medium_first())
                    .map(str::to_owned),
                overview,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer) -> TvMazeClient {
        TvMazeClient::new(
            Url::parse(&server.uri()).unwrap(),
            Duration::from_secs(5),
            0,
            Duration::from_millis(1),
        )
        .unwrap()
    }

    #[test]
    fn parse_meta_id_accepts_only_prefixed_numeric_ids() {
        assert_eq!(parse_meta_id("tvmaze:42"), Some(42));
        assert_eq!(parse_meta_id("tvmaze:"), None);
        assert_eq!(parse_meta_id("tvmaze:abc"), None);
        assert_eq!(parse_meta_id("42"), None);
        assert_eq!(parse_meta_id("imdb:tt42"), None);
    }

    #[tokio::test]
    async fn meta_episodes_reference_the_requested_series() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/shows/131"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 131,
                "name": "Night Watch",
                "type": "Scripted",
                "image": {"medium": "https://img/131-m.jpg", "original": "https://img/131-o.jpg"},
                "summary": "<p>City patrols.</p>"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/shows/131/episodes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": 1,
                    "name": "First Light",
                    "season": 1,
                    "number": 1,
                    "airdate": "2024-05-01",
                    "image": {"medium": "https://img/e1-m.jpg", "original": "https://img/e1-o.jpg"},
                    "summary": "<p>It begins.</p>"
                },
                {
                    "id": 2,
                    "name": "Long Dark",
                    "season": 2,
                    "number": 5,
                    "airdate": "",
                    "image": null,
                    "summary": null
                }
            ])))
            .mount(&server)
            .await;

        let meta = build_meta(&client(&server), "tvmaze:131").await;

        assert_eq!(meta.id, "tvmaze:131");
        assert_eq!(meta.media_type, "series");
        assert_eq!(meta.name, "Night Watch");
        assert_eq!(meta.poster, "https://img/131-o.jpg");
        assert_eq!(meta.description, "City patrols.");
        assert_eq!(meta.episodes.len(), 2);
        assert!(meta.episodes.iter().all(|episode| episode.series == "tvmaze:131"));

        assert_eq!(meta.episodes[0].id, "tvmaze:131:s1e1");
        assert_eq!(meta.episodes[0].released.as_deref(), Some("2024-05-01"));
        assert_eq!(meta.episodes[0].thumbnail.as_deref(), Some("https://img/e1-m.jpg"));
        assert_eq!(meta.episodes[0].overview.as_deref(), Some("It begins."));

        assert_eq!(meta.episodes[1].id, "tvmaze:131:s2e5");
        assert_eq!(meta.episodes[1].released, None);
        assert_eq!(meta.episodes[1].thumbnail, None);
        assert_eq!(meta.episodes[1].overview, None);
    }

    #[tokio::test]
    async fn missing_show_degrades_to_placeholder_meta() {
        let server = MockServer::start().await;

        let meta = build_meta(&client(&server), "tvmaze:999").await;

        assert_eq!(meta.id, "tvmaze:999");
        assert_eq!(meta.name, "Unknown Show");
        assert_eq!(meta.poster, stremio::PLACEHOLDER_POSTER);
        assert_eq!(meta.description, "");
        assert!(meta.episodes.is_empty());
    }

    #[tokio::test]
    async fn episode_list_survives_a_missing_show_record() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/shows/77/episodes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": 9,
                    "name": "Orphan",
                    "season": 1,
                    "number": 1,
                    "airdate": "2024-03-03",
                    "image": {"medium": "https://img/e9-m.jpg", "original": "https://img/e9-o.jpg"}
                }
            ])))
            .mount(&server)
            .await;

        let meta = build_meta(&client(&server), "tvmaze:77").await;

        assert_eq!(meta.name, "Unknown Show");
        assert_eq!(meta.poster, "https://img/e9-o.jpg");
        assert_eq!(meta.episodes.len(), 1);
    }

    #[tokio::test]
    async fn episodes_sort_by_season_then_number() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/shows/5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 5,
                "name": "Ordered"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/shows/5/episodes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "name": "s2e1", "season": 2, "number": 1},
                {"id": 2, "name": "s1e2", "season": 1, "number": 2},
                {"id": 3, "name": "s1e1", "season": 1, "number": 1},
                {"id": 4, "name": "special", "season": null, "number": null}
            ])))
            .mount(&server)
            .await;

        let meta = build_meta(&client(&server), "tvmaze:5").await;

        let ids: Vec<&str> = meta.episodes.iter().map(|episode| episode.id.as_str()).collect();
        assert_eq!(
            ids,
            ["tvmaze:5:s0e0", "tvmaze:5:s1e1", "tvmaze:5:s1e2", "tvmaze:5:s2e1"]
        );
    }

    #[tokio::test]
    async fn malformed_meta_id_skips_upstream_entirely() {
        let server = MockServer::start().await;

        let meta = build_meta(&client(&server), "imdb:tt123").await;

        assert_eq!(meta.name, "Unknown Show");
        assert!(meta.episodes.is_empty());
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
