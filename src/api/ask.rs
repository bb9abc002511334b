use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::models::{AskRequest, AskResponse};
use crate::query::NO_QUESTION;
use crate::state::AppState;

pub const INTERNAL_ERROR: &str = "Something went wrong.";

/// POST /api/ask - Answer a natural-language question about a registered repo
pub async fn ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> (StatusCode, Json<AskResponse>) {
    let query = req.query.trim().to_string();
    if query.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(AskResponse::message(NO_QUESTION)));
    }

    // Run the pipeline on its own task so a panic surfaces as a JoinError
    let engine = state.engine.clone();
    match tokio::spawn(async move { engine.answer(&query).await }).await {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(e) => {
            tracing::error!("Ask pipeline failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AskResponse::message(INTERNAL_ERROR)),
            )
        }
    }
}
