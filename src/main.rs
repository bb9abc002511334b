use axum::routing::{delete, get, post};
use axum::Router;
use tracing_subscriber::EnvFilter;

use repo_ask::api;
use repo_ask::config::Config;
use repo_ask::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!(
        "LLM provider: {} ({}), models: {}",
        config.llm.provider,
        config.llm.base_url,
        config.llm.chat_models.join(", ")
    );
    if config.github.token.is_none() {
        tracing::warn!("No GITHUB_TOKEN set; GitHub API calls are unauthenticated");
    }

    let state = AppState::new(config.clone())?;

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/ask", post(api::ask::ask))
        .route("/api/repos", get(api::repos::list_repos))
        .route("/api/repos", post(api::repos::add_repo))
        .route("/api/repos/{name}", delete(api::repos::delete_repo))
        .route("/api/repos/{name}/reindex", post(api::repos::reindex_repo))
        .route("/api/repos/{name}/stats", get(api::repos::repo_stats))
        .route("/api/onboard", post(api::onboard::onboard))
        .route("/api/debug/{repo}/file-list", get(api::debug::file_list))
        .route("/api/debug/{repo}/vector-count", get(api::debug::vector_count))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}
