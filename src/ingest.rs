use anyhow::{Context, Result};

use crate::chunking::{chunk_text, DEFAULT_CHUNK_CHARS};
use crate::git::SourceControl;
use crate::llm::Embedder;
use crate::models::RepoRef;
use crate::search::VectorIndex;

/// Fetch, chunk, embed and index every listable file of `repo`.
///
/// Files are processed one at a time and upserted per file; a file that
/// fails to read or index is logged and skipped. Every chunk is tagged with
/// the head commit when the history is readable. Returns the number of
/// chunks stored.
pub async fn process_repository(
    source: &dyn SourceControl,
    embedder: &dyn Embedder,
    vectors: &dyn VectorIndex,
    repo: &RepoRef,
) -> Result<usize> {
    tracing::info!("Processing {} -> {}", repo.url, repo.collection_name);

    let files = source
        .list_files(&repo.url, true)
        .await
        .with_context(|| format!("Failed to list files for {}", repo.name))?;
    tracing::info!("Found {} files in {}", files.len(), repo.name);

    let head = match source.list_commits(&repo.url, 1).await {
        Ok(commits) => commits.into_iter().next().map(|c| c.sha),
        Err(e) => {
            tracing::warn!("No head commit for {}: {e:#}", repo.name);
            None
        }
    };

    let mut total_chunks = 0usize;

    for file in &files {
        let content = match source.read_file(&repo.url, &file.path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Skipping {}: {e:#}", file.path);
                continue;
            }
        };
        if content.trim().is_empty() {
            continue;
        }

        let mut chunks = chunk_text(&content, &file.path, head.as_deref(), DEFAULT_CHUNK_CHARS);
        for chunk in &mut chunks {
            chunk.embedding = Some(embedder.embed(&chunk.text).await);
        }

        let count = chunks.len();
        if let Err(e) = vectors.upsert(&repo.collection_name, chunks).await {
            tracing::warn!("Failed to index {}: {e:#}", file.path);
            continue;
        }
        tracing::debug!("{} -> {count} chunks", file.path);
        total_chunks += count;
    }

    tracing::info!("Indexed {total_chunks} chunks for {}", repo.name);
    Ok(total_chunks)
}
