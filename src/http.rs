use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::meta;
use crate::stremio::{self, CatalogResponse, MetaResponse};
use crate::{AppState, SharedAppState};

pub fn router(state: SharedAppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(addon_handler).options(preflight))
        .route("/api", get(addon_handler).options(preflight))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct AddonQuery {
    manifest: Option<String>,
    catalog: Option<String>,
    #[serde(rename = "type")]
    media_type: Option<String>,
    id: Option<String>,
}

impl AddonQuery {
    fn operation(&self) -> AddonOperation<'_> {
        if self.manifest.is_some() {
            return AddonOperation::Manifest;
        }

        let series = self.media_type.as_deref() == Some(stremio::SERIES_TYPE);

        if series && self.catalog.as_deref() == Some(stremio::CATALOG_ID) {
            return AddonOperation::Catalog;
        }

        if series
            && let Some(id) = self.id.as_deref()
            && id.starts_with(stremio::ID_PREFIX)
        {
            return AddonOperation::Meta(id);
        }

        AddonOperation::Status
    }
}

enum AddonOperation<'a> {
    Manifest,
    Catalog,
    Meta(&'a str),
    Status,
}

impl AddonOperation<'_> {
    fn name(&self) -> &'static str {
        match self {
            AddonOperation::Manifest => "manifest",
            AddonOperation::Catalog => "catalog",
            AddonOperation::Meta(_) => "meta",
            AddonOperation::Status => "status",
        }
    }
}

// Every request ends in a 200 with a JSON body; queries that match nothing
// get the status payload, and so do unparseable query strings.
async fn addon_handler(
    State(state): State<SharedAppState>,
    query: Result<Query<AddonQuery>, QueryRejection>,
) -> Response {
    let query = query.map(|Query(query)| query).unwrap_or_else(|rejection| {
        debug!(
            error = %rejection,
            "malformed query string; treating request as a status probe"
        );
        AddonQuery::default()
    });

    let operation = query.operation();

    info!(
        operation = operation.name(),
        media_type = query.media_type.as_deref(),
        id = query.id.as_deref(),
        "addon request received"
    );

    match operation {
        AddonOperation::Manifest => respond_manifest(&state),
        AddonOperation::Catalog => respond_catalog(&state).await,
        AddonOperation::Meta(meta_id) => respond_meta(&state, meta_id).await,
        AddonOperation::Status => respond_status(),
    }
}

async fn preflight() -> Response {
    (cors_headers(), StatusCode::OK).into_response()
}

fn respond_manifest(state: &AppState) -> Response {
    let manifest = stremio::build_manifest(&state.config);
    (cors_headers(), Json(manifest)).into_response()
}

async fn respond_catalog(state: &AppState) -> Response {
    let entries = state.catalog.entries().await;
    (cors_headers(), Json(CatalogResponse { metas: &entries })).into_response()
}

async fn respond_meta(state: &AppState, meta_id: &str) -> Response {
    let meta = meta::build_meta(&state.tvmaze, meta_id).await;
    (cors_headers(), Json(MetaResponse { meta })).into_response()
}

fn respond_status() -> Response {
    (cors_headers(), Json(json!({ "status": "ok" }))).into_response()
}

fn cors_headers() -> [(header::HeaderName, &'static str); 3] {
    [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        (header::ACCESS_CONTROL_ALLOW_METHODS, "GET,OPTIONS"),
        (header::ACCESS_CONTROL_ALLOW_HEADERS, "*"),
    ]
}
