use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::ingest::process_repository;
use crate::models::{AddRepoRequest, RepoRef, RepoStats};
use crate::state::AppState;

/// Display name derived from a clone URL: last path segment without `.git`.
pub fn name_from_url(url: &str) -> String {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .trim_end_matches(".git")
        .to_string()
}

/// GET /api/repos - List registered repos, oldest first
pub async fn list_repos(State(state): State<AppState>) -> Json<Vec<RepoRef>> {
    Json(state.registry.list_all())
}

/// POST /api/repos - Register a repo and ingest it in the background
pub async fn add_repo(
    State(state): State<AppState>,
    Json(req): Json<AddRepoRequest>,
) -> Result<(StatusCode, Json<RepoRef>), (StatusCode, String)> {
    let url = req.url.trim().to_string();
    if url.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "URL is required".to_string()));
    }
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err((
            StatusCode::BAD_REQUEST,
            "Only https:// and http:// URLs are allowed".to_string(),
        ));
    }

    let name = req
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| name_from_url(&url));
    if name.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Could not derive a repo name from the URL".to_string(),
        ));
    }

    if let Some(existing) = state.registry.conflict(&name) {
        return Err((
            StatusCode::CONFLICT,
            format!("{name} clashes with the already added repo {}", existing.name),
        ));
    }

    let repo = state
        .registry
        .add(&name, &url)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))?;

    spawn_ingest(&state, repo.clone());

    Ok((StatusCode::CREATED, Json(repo)))
}

/// Ingest `repo` on a background task; failures are logged.
fn spawn_ingest(state: &AppState, repo: RepoRef) {
    let state = state.clone();
    tokio::spawn(async move {
        let result = process_repository(
            state.source.as_ref(),
            state.embedder.as_ref(),
            state.vectors.as_ref(),
            &repo,
        )
        .await;
        if let Err(e) = result {
            tracing::error!("Failed to ingest {}: {e:#}", repo.url);
        }
    });
}

/// POST /api/repos/{name}/reindex - Drop the repo's chunks and ingest it again
pub async fn reindex_repo(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<(StatusCode, Json<RepoRef>), (StatusCode, String)> {
    let Some(repo) = state.registry.lookup(&name) else {
        return Err((StatusCode::NOT_FOUND, "Repo not found".to_string()));
    };

    state
        .vectors
        .delete_collection(&repo.collection_name)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))?;

    tracing::info!("Re-indexing {}", repo.name);
    spawn_ingest(&state, repo.clone());

    Ok((StatusCode::ACCEPTED, Json(repo)))
}

/// GET /api/repos/{name}/stats - Stars, forks, issues and activity from GitHub
pub async fn repo_stats(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<RepoStats>, (StatusCode, String)> {
    let Some(repo) = state.registry.lookup(&name) else {
        return Err((StatusCode::NOT_FOUND, "Repo not found".to_string()));
    };

    match state.source.repo_stats(&repo.url).await {
        Ok(Some(stats)) => Ok(Json(stats)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            format!("{} was not found on GitHub", repo.url),
        )),
        Err(e) => {
            tracing::warn!("Fetching stats for {} failed: {e:#}", repo.name);
            Err((StatusCode::BAD_GATEWAY, format!("{e:#}")))
        }
    }
}

/// DELETE /api/repos/{name} - Drop a repo's chunks and its registry entry
pub async fn delete_repo(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let Some(repo) = state.registry.lookup(&name) else {
        return Err((StatusCode::NOT_FOUND, "Repo not found".to_string()));
    };

    if let Err(e) = state.vectors.delete_collection(&repo.collection_name).await {
        tracing::warn!("Failed to delete vectors for {}: {e:#}", repo.name);
    }

    state
        .registry
        .remove(&repo.name)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_from_url() {
        assert_eq!(name_from_url("https://github.com/acme/sweetcrave.git"), "sweetcrave");
        assert_eq!(name_from_url("https://github.com/acme/widgets/"), "widgets");
        assert_eq!(name_from_url("https://github.com/acme/widgets"), "widgets");
    }
}
