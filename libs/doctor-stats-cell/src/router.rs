use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::{Clock, StatsService, SystemClock};
use crate::store::StatsStore;

pub struct StatsState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn StatsStore>,
    pub service: StatsService,
    pub clock: Arc<dyn Clock>,
}

impl StatsState {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn StatsStore>) -> Self {
        let service = StatsService::new(store.clone(), config.query_timeout());
        Self {
            config,
            store,
            service,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Authenticated doctor routes, nested under `/doctors`.
pub fn doctor_stats_routes(state: Arc<StatsState>) -> Router {
    Router::new()
        .route("/me/stats", get(handlers::get_my_stats))
        .route_layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}

pub fn health_routes(state: Arc<StatsState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .with_state(state)
}
