//! Embedding and text-completion capabilities, plus the helpers layered on
//! top of them (retrying caller, keyword expansion, output sanitizing).

pub mod completion;
pub mod embeddings;
pub mod query_expand;
pub mod resilient;
pub mod sanitize;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Turns text into a fixed-length vector.
///
/// Implementations must always return a vector: on provider failure they
/// degrade to a random one of the configured dimension rather than erroring.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Vec<f32>;
}

/// Single-shot text completion against a named model.
#[async_trait]
pub trait Completer: Send + Sync {
    async fn complete(&self, prompt: &str, model: &str) -> Result<String, CompletionError>;
}

#[derive(Debug, Error)]
pub enum CompletionError {
    /// Quota or rate limit hit; worth retrying after a pause.
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    /// The provider refused the prompt (safety filter, policy block).
    #[error("completion blocked: {0}")]
    Blocked(String),

    #[error("completion request failed: {0}")]
    Request(String),

    #[error("malformed completion response: {0}")]
    Malformed(String),

    #[error("no completion models configured")]
    NoModels,
}

impl CompletionError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, CompletionError::RateLimited { .. })
    }
}
