use super::flow_analysis::analyze;
use super::prompts::flow_prompt;
use super::{truncate_chars, try_or_default, ModeAnswer, QueryEngine};
use crate::llm::sanitize::sanitize;
use crate::models::{CodeChunk, RepoRef};

const FLOW_SEARCH_LIMIT: usize = 12;
const MAX_CONTEXT_CHARS: usize = 15_000;

/// Documentation chunks describe intent, not behavior.
fn is_documentation(path: &str) -> bool {
    let lower = path.to_lowercase();
    lower.ends_with(".md") || lower.ends_with(".mdx") || lower.contains("readme")
}

pub(crate) fn code_context(chunks: &[CodeChunk], max_chars: usize) -> String {
    let joined = chunks
        .iter()
        .map(|c| format!("File: {}\n{}", c.file_path, c.text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");
    truncate_chars(&joined, max_chars).to_string()
}

pub(super) async fn answer(engine: &QueryEngine, repo: &RepoRef, query: &str) -> ModeAnswer {
    let vector = engine.embedder.embed(query).await;
    let hits = try_or_default(
        engine
            .vectors
            .search(&repo.collection_name, &vector, FLOW_SEARCH_LIMIT),
        Vec::new(),
        "Vector search",
    )
    .await;

    let chunks: Vec<CodeChunk> = hits
        .into_iter()
        .filter(|c| !is_documentation(&c.file_path))
        .collect();
    let analysis = analyze(&chunks);
    tracing::info!(
        "Flow context: {} chunks, {} functions, empty={}",
        chunks.len(),
        analysis.functions.len(),
        analysis.empty
    );

    let prompt = flow_prompt(query, &analysis, &code_context(&chunks, MAX_CONTEXT_CHARS));
    let answer = match engine.complete(&prompt).await {
        Ok(raw) => sanitize(&raw),
        Err(notice) => notice,
    };

    ModeAnswer {
        answer,
        context: Some(chunks),
        timeline: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documentation_filter() {
        assert!(is_documentation("README.md"));
        assert!(is_documentation("docs/guide.mdx"));
        assert!(is_documentation("packages/readme-utils/index.ts"));
        assert!(!is_documentation("src/auth.ts"));
    }

    #[test]
    fn test_code_context_is_bounded() {
        let chunk = CodeChunk {
            id: "1".into(),
            text: "x".repeat(100),
            file_path: "a.ts".into(),
            commit: None,
            embedding: None,
            score: None,
        };
        let ctx = code_context(&[chunk.clone(), chunk], 50);
        assert_eq!(ctx.chars().count(), 50);
        assert!(ctx.starts_with("File: a.ts\n"));
    }
}
