use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::llm::resilient::RetryPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where the registry, report cache and vector data are stored
    pub data_dir: PathBuf,
    /// Server bind address
    pub bind_addr: String,
    /// LLM provider configuration
    pub llm: LlmConfig,
    /// GitHub API configuration
    pub github: GitHubConfig,
    /// How long generated reports stay cached, in hours
    pub report_ttl_hours: u64,
    /// Completion attempts per model before falling through to the next one
    pub max_retries: u32,
    /// First backoff delay after a rate-limited completion, in milliseconds
    pub backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama" or "openai"
    pub provider: String,
    /// Base URL for the LLM API
    pub base_url: String,
    /// Completion models, tried in order
    pub chat_models: Vec<String>,
    /// Model name for embeddings
    pub embedding_model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
    /// Embedding vector dimension
    pub embedding_dim: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// REST API root, overridable for GitHub Enterprise
    pub api_url: String,
    /// Personal access token; unauthenticated requests are heavily rate limited
    pub token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            bind_addr: "127.0.0.1:9000".to_string(),
            llm: LlmConfig::default(),
            github: GitHubConfig::default(),
            report_ttl_hours: 24,
            max_retries: 3,
            backoff_ms: 2_000,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            chat_models: vec!["llama3.2".to_string()],
            embedding_model: "nomic-embed-text".to_string(),
            api_key: None,
            embedding_dim: 768,
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            token: None,
        }
    }
}

impl LlmConfig {
    /// The model used for cheap auxiliary calls (keyword expansion).
    pub fn primary_model(&self) -> &str {
        self.chat_models.first().map(String::as_str).unwrap_or("")
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("REPO_ASK_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(addr) = std::env::var("REPO_ASK_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(provider) = std::env::var("LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(models) = std::env::var("LLM_CHAT_MODELS") {
            let models = parse_model_list(&models);
            if !models.is_empty() {
                config.llm.chat_models = models;
            }
        }
        if let Ok(model) = std::env::var("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Ok(dim) = std::env::var("LLM_EMBEDDING_DIM") {
            if let Ok(d) = dim.parse() {
                config.llm.embedding_dim = d;
            }
        }
        if let Ok(url) = std::env::var("GITHUB_API_URL") {
            config.github.api_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(token) = std::env::var("GITHUB_TOKEN").or_else(|_| std::env::var("GH_TOKEN")) {
            config.github.token = Some(token);
        }
        if let Ok(val) = std::env::var("REPO_ASK_REPORT_TTL_HOURS") {
            if let Ok(v) = val.parse() {
                config.report_ttl_hours = v;
            }
        }
        if let Ok(val) = std::env::var("REPO_ASK_MAX_RETRIES") {
            if let Ok(v) = val.parse::<u32>() {
                config.max_retries = v.max(1);
            }
        }
        if let Ok(val) = std::env::var("REPO_ASK_BACKOFF_MS") {
            if let Ok(v) = val.parse() {
                config.backoff_ms = v;
            }
        }

        config
    }

    pub fn report_ttl(&self) -> Duration {
        Duration::from_secs(self.report_ttl_hours * 60 * 60)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            base_delay: Duration::from_millis(self.backoff_ms),
            ..RetryPolicy::default()
        }
    }

    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join("repos.json")
    }

    pub fn cache_path(&self) -> PathBuf {
        self.data_dir.join("report-cache.json")
    }

    pub fn vector_dir(&self) -> PathBuf {
        self.data_dir.join("vectors")
    }
}

fn parse_model_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_model_list() {
        assert_eq!(
            parse_model_list(" gemini-2.0-flash, gemini-1.5-flash ,,"),
            vec!["gemini-2.0-flash", "gemini-1.5-flash"]
        );
        assert!(parse_model_list(" , ").is_empty());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.report_ttl(), Duration::from_secs(86_400));
        assert_eq!(config.llm.primary_model(), "llama3.2");
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(2));
    }
}
