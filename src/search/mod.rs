//! Vector retrieval over chunked repository content.

pub mod vector;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::CodeChunk;

/// Similarity search over named collections of embedded chunks.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert chunks (with embeddings) into `collection`, replacing any
    /// existing chunk with the same id. Chunks without an embedding are skipped.
    async fn upsert(&self, collection: &str, chunks: Vec<CodeChunk>) -> Result<()>;

    /// Top `k` chunks by similarity, `score` populated and `embedding` omitted.
    /// A collection that does not exist yields an empty list.
    async fn search(&self, collection: &str, vector: &[f32], k: usize) -> Result<Vec<CodeChunk>>;

    async fn delete_collection(&self, collection: &str) -> Result<()>;

    async fn count(&self, collection: &str) -> Result<usize>;
}
