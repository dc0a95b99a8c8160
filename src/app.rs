// Application state shared across handlers

use std::sync::Arc;
use std::time::Duration;

use crate::{
    app_config::AppConfig,
    db::DbPool,
    services::geo::{DisabledGeoProvider, GeoProvider, HttpGeoProvider},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub geo: Arc<dyn GeoProvider>,
    pub config: &'static AppConfig,
}

impl AppState {
    pub fn new(pool: DbPool, config: &'static AppConfig) -> Self {
        let geo: Arc<dyn GeoProvider> = if config.geo_lookup_enabled {
            Arc::new(HttpGeoProvider::new(Duration::from_secs(
                config.geo_timeout_secs,
            )))
        } else {
            Arc::new(DisabledGeoProvider)
        };
        Self { pool, geo, config }
    }

    /// State with a caller-supplied geo provider (tests use a fixed one)
    pub fn with_geo(pool: DbPool, config: &'static AppConfig, geo: Arc<dyn GeoProvider>) -> Self {
        Self { pool, geo, config }
    }
}
