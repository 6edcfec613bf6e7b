use std::sync::Arc;

use axum::{routing::get, Router};
use tracing::{info, warn};

use doctor_stats_cell::router::{doctor_stats_routes, health_routes, StatsState};
use doctor_stats_cell::store::StatsStore;
use doctor_stats_cell::SupabaseStatsStore;
use shared_config::AppConfig;

/// Builds the Supabase-backed state. An unreachable store is logged, not
/// fatal: the server still starts and `/health` reports 503 until it answers.
pub async fn build_state(config: Arc<AppConfig>) -> Arc<StatsState> {
    let store = Arc::new(SupabaseStatsStore::new(&config));

    match store.ping().await {
        Ok(()) => info!("Supabase reachable at {}", config.supabase_url),
        Err(e) => warn!("Supabase not reachable at startup, serving anyway: {:#}", e),
    }

    Arc::new(StatsState::new(config, store))
}

pub fn create_router(state: Arc<StatsState>) -> Router {
    Router::new()
        .route("/", get(|| async { "MedConnect API is running!" }))
        .merge(health_routes(state.clone()))
        .nest("/doctors", doctor_stats_routes(state))
}
