use std::sync::Arc;

use crate::cache::ReportCache;
use crate::config::Config;
use crate::git::github::GitHubClient;
use crate::git::SourceControl;
use crate::llm::completion::HttpCompleter;
use crate::llm::embeddings::HttpEmbedder;
use crate::llm::query_expand::KeywordExpander;
use crate::llm::resilient::ResilientCompleter;
use crate::llm::{Completer, Embedder};
use crate::query::QueryEngine;
use crate::registry::RepoRegistry;
use crate::search::vector::VectorStore;
use crate::search::VectorIndex;
use crate::store::{JsonFileStore, KeyValueStore};

/// The external collaborators the service is assembled from.
pub struct Capabilities {
    pub registry_store: Arc<dyn KeyValueStore>,
    pub cache_store: Arc<dyn KeyValueStore>,
    pub embedder: Arc<dyn Embedder>,
    pub completer: Arc<dyn Completer>,
    pub vectors: Arc<dyn VectorIndex>,
    pub source: Arc<dyn SourceControl>,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub registry: Arc<RepoRegistry>,
    pub cache: Arc<ReportCache>,
    pub embedder: Arc<dyn Embedder>,
    pub vectors: Arc<dyn VectorIndex>,
    pub source: Arc<dyn SourceControl>,
    pub engine: Arc<QueryEngine>,
}

impl AppState {
    /// Production wiring: JSON files under `data_dir`, HTTP providers.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let http_client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        let capabilities = Capabilities {
            registry_store: Arc::new(JsonFileStore::open(&config.registry_path())?),
            cache_store: Arc::new(JsonFileStore::open(&config.cache_path())?),
            embedder: Arc::new(HttpEmbedder::new(http_client.clone(), config.llm.clone())),
            completer: Arc::new(HttpCompleter::new(http_client.clone(), config.llm.clone())),
            vectors: Arc::new(VectorStore::open_or_create(&config.vector_dir())?),
            source: Arc::new(GitHubClient::new(http_client, &config.github)),
        };

        Ok(Self::with_capabilities(config, capabilities))
    }

    pub fn with_capabilities(config: Config, caps: Capabilities) -> Self {
        let registry = Arc::new(RepoRegistry::new(caps.registry_store));
        let cache = Arc::new(ReportCache::new(caps.cache_store, config.report_ttl()));

        let completer = Arc::new(ResilientCompleter::new(
            caps.completer.clone(),
            config.llm.chat_models.clone(),
            config.retry_policy(),
        ));
        let expander = KeywordExpander::new(caps.completer, config.llm.primary_model());

        let engine = Arc::new(QueryEngine::new(
            registry.clone(),
            cache.clone(),
            caps.embedder.clone(),
            caps.vectors.clone(),
            caps.source.clone(),
            completer,
            expander,
        ));

        Self {
            config,
            registry,
            cache,
            embedder: caps.embedder,
            vectors: caps.vectors,
            source: caps.source,
            engine,
        }
    }
}
