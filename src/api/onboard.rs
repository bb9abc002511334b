use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::models::{OnboardRequest, OnboardResponse};
use crate::state::AppState;

/// POST /api/onboard - Onboarding guide built from the tree and key files
pub async fn onboard(
    State(state): State<AppState>,
    Json(req): Json<OnboardRequest>,
) -> Result<Json<OnboardResponse>, (StatusCode, String)> {
    let name = req.repo_name.trim();
    if name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Repo name is required".to_string()));
    }
    let Some(repo) = state.registry.lookup(name) else {
        return Err((StatusCode::NOT_FOUND, "Repo not found".to_string()));
    };

    state
        .engine
        .onboarding_report(&repo)
        .await
        .map(|report| Json(OnboardResponse { report }))
        .map_err(|notice| (StatusCode::SERVICE_UNAVAILABLE, notice))
}
