use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::auth::{User, DOCTOR_ROLE};
use shared_models::error::AppError;
use shared_utils::extractor::require_role;

use crate::models::StatsResponse;
use crate::router::StatsState;
use crate::window::StatsWindow;

/// Dashboard statistics for the calling doctor. The doctor is always the
/// token subject; no path or query parameter selects another doctor.
#[axum::debug_handler]
pub async fn get_my_stats(
    State(state): State<Arc<StatsState>>,
    Extension(user): Extension<User>,
) -> Result<Json<StatsResponse>, AppError> {
    require_role(&user, DOCTOR_ROLE)?;

    let window = StatsWindow::containing(&state.clock.now())?;
    let snapshot = state.service.snapshot(&user.id, &window).await?;

    Ok(Json(StatsResponse::from(snapshot)))
}

#[axum::debug_handler]
pub async fn health(State(state): State<Arc<StatsState>>) -> Result<Json<Value>, AppError> {
    state
        .store
        .ping()
        .await
        .map_err(|e| AppError::ServiceUnavailable(format!("store ping failed: {:#}", e)))?;

    Ok(Json(json!({ "status": "ok" })))
}
