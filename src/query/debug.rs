//! Root-cause analysis. Never cached: the answer depends on the question.

use super::flow::code_context;
use super::keywords::{extract_keywords, STOPWORDS};
use super::prompts::debug_prompt;
use super::{try_or_default, ModeAnswer, QueryEngine};
use crate::llm::sanitize::sanitize;
use crate::models::{CommitInfo, RepoRef};

const DEBUG_SEARCH_LIMIT: usize = 8;
const DEBUG_HISTORY_LIMIT: usize = 20;
const MAX_CONTEXT_CHARS: usize = 15_000;
const NO_COMMITS: &str = "No commit history available.";

pub fn no_relevant_code(topic: &str, repo_name: &str) -> String {
    format!(
        "I could not find any relevant code for \"{topic}\" in {repo_name}.\n\n\
         Possible reasons:\n\
         - The repository has not been indexed yet, or indexing is still running.\n\
         - The feature may use different names in the code. Try mentioning a function, \
         component or file name.\n\
         - The problem may come from configuration, data or an external service rather than \
         from code in this repository."
    )
}

fn history_text(commits: &[CommitInfo]) -> String {
    if commits.is_empty() {
        return NO_COMMITS.to_string();
    }
    commits
        .iter()
        .map(|c| {
            format!(
                "- {} | {} | {} | {}",
                c.sha,
                c.author,
                c.date,
                c.message.lines().next().unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub(super) async fn answer(engine: &QueryEngine, repo: &RepoRef, query: &str) -> ModeAnswer {
    let keywords = extract_keywords(query, STOPWORDS);
    let terms = engine.expander.expand(&keywords).await;
    let search_text = if terms.is_empty() {
        query.to_string()
    } else {
        format!("{query} {}", terms.join(" "))
    };

    let vector = engine.embedder.embed(&search_text).await;
    let chunks = try_or_default(
        engine
            .vectors
            .search(&repo.collection_name, &vector, DEBUG_SEARCH_LIMIT),
        Vec::new(),
        "Vector search",
    )
    .await;

    if chunks.is_empty() {
        let topic = if keywords.is_empty() {
            query.to_string()
        } else {
            keywords.join(" ")
        };
        tracing::info!("No code found for debug question in {}", repo.name);
        return ModeAnswer::text(no_relevant_code(&topic, &repo.name));
    }

    let commits = try_or_default(
        engine.source.list_commits(&repo.url, DEBUG_HISTORY_LIMIT),
        Vec::new(),
        "Commit history",
    )
    .await;

    let prompt = debug_prompt(
        query,
        &code_context(&chunks, MAX_CONTEXT_CHARS),
        &history_text(&commits),
    );
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
    fn test_no_relevant_code_message() {
        let msg = no_relevant_code("checkout timeout", "demo");
        assert!(msg.starts_with("I could not find any relevant code for \"checkout timeout\""));
        assert_eq!(msg.lines().filter(|l| l.starts_with("- ")).count(), 3);
    }

    #[test]
    fn test_history_text() {
        assert_eq!(history_text(&[]), NO_COMMITS);
        let commits = vec![CommitInfo {
            sha: "abc".into(),
            author: "alice".into(),
            date: "2024-01-01T00:00:00Z".into(),
            message: "Fix login\n\nlong body".into(),
            html_url: String::new(),
        }];
        assert_eq!(
            history_text(&commits),
            "- abc | alice | 2024-01-01T00:00:00Z | Fix login"
        );
    }
}
