use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::VectorIndex;
use crate::models::CodeChunk;

/// A stored vector entry
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VectorEntry {
    id: String,
    collection: String,
    file_path: String,
    text: String,
    #[serde(default)]
    commit: Option<String>,
    embedding: Vec<f32>,
}

/// In-memory vector store with disk persistence and cosine similarity search.
/// Entries are partitioned by collection name.
pub struct VectorStore {
    entries: RwLock<Vec<VectorEntry>>,
    persist_path: Option<PathBuf>,
}

impl VectorStore {
    pub fn open_or_create(vector_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(vector_dir)?;
        let persist_path = vector_dir.join("vectors.json");

        let entries = if persist_path.exists() {
            let data = std::fs::read_to_string(&persist_path)
                .context("Failed to read vector store")?;
            serde_json::from_str(&data).unwrap_or_else(|e| {
                tracing::warn!("Vector store at {} is unreadable, starting empty: {e}", persist_path.display());
                Vec::new()
            })
        } else {
            Vec::new()
        };

        Ok(Self {
            entries: RwLock::new(entries),
            persist_path: Some(persist_path),
        })
    }

    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            persist_path: None,
        }
    }

    /// Write all entries to disk (atomic write via temp file + rename).
    fn persist(&self, entries: &[VectorEntry]) -> Result<()> {
        let Some(path) = &self.persist_path else {
            return Ok(());
        };
        let data = serde_json::to_string(entries)?;
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, data).context("Failed to write vector store")?;
        std::fs::rename(&tmp_path, path).context("Failed to replace vector store")?;
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for VectorStore {
    async fn upsert(&self, collection: &str, chunks: Vec<CodeChunk>) -> Result<()> {
        let mut entries = self.entries.write();

        for chunk in chunks {
            let Some(embedding) = chunk.embedding else {
                tracing::warn!("Skipping chunk {} from {} without embedding", chunk.id, chunk.file_path);
                continue;
            };
            entries.retain(|e| !(e.collection == collection && e.id == chunk.id));
            entries.push(VectorEntry {
                id: chunk.id,
                collection: collection.to_string(),
                file_path: chunk.file_path,
                text: chunk.text,
                commit: chunk.commit,
                embedding,
            });
        }

        self.persist(&entries)
    }

    async fn search(&self, collection: &str, vector: &[f32], k: usize) -> Result<Vec<CodeChunk>> {
        let entries = self.entries.read();

        let mut scored: Vec<(f32, &VectorEntry)> = entries
            .iter()
            .filter(|e| e.collection == collection)
            .map(|e| (cosine_similarity(vector, &e.embedding), e))
            .collect();

        // Sort descending by score
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(score, e)| CodeChunk {
                id: e.id.clone(),
                text: e.text.clone(),
                file_path: e.file_path.clone(),
                commit: e.commit.clone(),
                embedding: None,
                score: Some(score),
            })
            .collect())
    }

    async fn delete_collection(&self, collection: &str) -> Result<()> {
        let mut entries = self.entries.write();
        entries.retain(|e| e.collection != collection);
        self.persist(&entries)
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|e| e.collection == collection)
            .count())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, path: &str, embedding: Vec<f32>) -> CodeChunk {
        CodeChunk {
            id: id.to_string(),
            text: format!("contents of {path}"),
            file_path: path.to_string(),
            commit: None,
            embedding: Some(embedding),
            score: None,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity_within_collection() {
        let store = VectorStore::in_memory();
        store
            .upsert(
                "code_chunks_a",
                vec![
                    chunk("1", "src/auth.ts", vec![1.0, 0.0]),
                    chunk("2", "src/db.ts", vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();
        store
            .upsert("code_chunks_b", vec![chunk("3", "other.ts", vec![1.0, 0.0])])
            .await
            .unwrap();

        let hits = store.search("code_chunks_a", &[0.9, 0.1], 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].file_path, "src/auth.ts");
        assert!(hits[0].score.unwrap() > hits[1].score.unwrap());
        assert!(hits[0].embedding.is_none());
    }

    #[tokio::test]
    async fn test_missing_collection_is_empty_not_error() {
        let store = VectorStore::in_memory();
        assert!(store.search("nope", &[1.0], 8).await.unwrap().is_empty());
        assert_eq!(store.count("nope").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_id_and_skips_unembedded() {
        let store = VectorStore::in_memory();
        store.upsert("c", vec![chunk("1", "a.ts", vec![1.0])]).await.unwrap();
        let mut bare = chunk("2", "b.ts", vec![]);
        bare.embedding = None;
        store
            .upsert("c", vec![chunk("1", "a2.ts", vec![1.0]), bare])
            .await
            .unwrap();

        assert_eq!(store.count("c").await.unwrap(), 1);
        let hits = store.search("c", &[1.0], 5).await.unwrap();
        assert_eq!(hits[0].file_path, "a2.ts");
    }

    #[tokio::test]
    async fn test_delete_collection_and_persistence() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = VectorStore::open_or_create(dir.path()).unwrap();
            store.upsert("keep", vec![chunk("1", "a.ts", vec![1.0])]).await.unwrap();
            store.upsert("drop", vec![chunk("2", "b.ts", vec![1.0])]).await.unwrap();
            store.delete_collection("drop").await.unwrap();
        }

        let reopened = VectorStore::open_or_create(dir.path()).unwrap();
        assert_eq!(reopened.count("keep").await.unwrap(), 1);
        assert_eq!(reopened.count("drop").await.unwrap(), 0);
    }
}
