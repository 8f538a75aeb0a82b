use std::sync::Arc;

use crate::catalog::CatalogStore;
use crate::config::AppConfig;
use crate::tvmaze::TvMazeClient;

pub mod catalog;
pub mod config;
pub mod export;
pub mod http;
pub mod meta;
pub mod stremio;
pub mod tvmaze;
pub mod window;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub tvmaze: TvMazeClient,
    pub catalog: CatalogStore,
}

pub type SharedAppState = Arc<AppState>;
