//! Inspection endpoints for checking what a repo looks like to the pipeline.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::models::RepoRef;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListResponse {
    pub repo: String,
    pub url: String,
    pub file_count: usize,
    pub files: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorCountResponse {
    pub repo: String,
    pub collection: String,
    pub vector_count: usize,
}

fn find_repo(state: &AppState, name: &str) -> Result<RepoRef, (StatusCode, String)> {
    state
        .registry
        .lookup(name)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Unknown repo {name}")))
}

/// GET /api/debug/{repo}/file-list - The filtered listing ingestion would use
pub async fn file_list(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<FileListResponse>, (StatusCode, String)> {
    let repo = find_repo(&state, &name)?;
    let files = state
        .source
        .list_files(&repo.url, true)
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, format!("{e:#}")))?;

    Ok(Json(FileListResponse {
        repo: repo.name,
        url: repo.url,
        file_count: files.len(),
        files: files.into_iter().map(|f| f.path).collect(),
    }))
}

/// GET /api/debug/{repo}/vector-count - Number of chunks indexed for a repo
pub async fn vector_count(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<VectorCountResponse>, (StatusCode, String)> {
    let repo = find_repo(&state, &name)?;
    let vector_count = state
        .vectors
        .count(&repo.collection_name)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))?;

    Ok(Json(VectorCountResponse {
        repo: repo.name,
        collection: repo.collection_name,
        vector_count,
    }))
}
