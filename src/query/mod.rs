//! Question answering pipeline.
//!
//! `@Repo` resolution, intent classification, then one handler per [`Mode`].
//! Every path ends in an answer string: auxiliary lookups degrade through
//! [`try_or_default`], completion failures become a user-facing notice.

mod command;
mod debug;
pub mod flow_analysis;
mod flow;
pub mod intent;
pub mod keywords;
pub mod prompts;
mod reports;
mod timeline;

use regex::Regex;
use std::future::Future;
use std::sync::{Arc, LazyLock};

use crate::cache::{ReportCache, ReportType};
use crate::git::SourceControl;
use crate::llm::query_expand::KeywordExpander;
use crate::llm::resilient::ResilientCompleter;
use crate::llm::sanitize::extract_mermaid;
use crate::llm::{CompletionError, Embedder};
use crate::models::{AskResponse, CodeChunk, RepoRef, TimelineSummary};
use crate::registry::RepoRegistry;
use crate::search::VectorIndex;

pub use intent::Mode;

pub const NO_QUESTION: &str = "Please provide a question.";
pub const NO_REPO_TOKEN: &str =
    "Please specify a repository using @RepoName (e.g., @sweetcrave how does auth work?).";

static REPO_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([\w.-]+)").expect("valid regex"));

pub fn unknown_repo_message(name: &str, available: &[String]) -> String {
    let list = if available.is_empty() {
        "None".to_string()
    } else {
        available.join(", ")
    };
    format!("Repository '@{name}' not found. Available repos: {list}.")
}

/// The repository name from the first `@Name` token, if any.
pub fn parse_repo_token(query: &str) -> Option<String> {
    let caps = REPO_TOKEN.captures(query)?;
    let name = caps[1].trim_end_matches(['.', '-']);
    (!name.is_empty()).then(|| name.to_string())
}

/// The query with its first `@Name` token removed and whitespace collapsed.
pub fn clean_query(query: &str) -> String {
    REPO_TOKEN
        .replace(query, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Await an auxiliary lookup, logging and substituting `fallback` on error.
pub async fn try_or_default<T, F>(fut: F, fallback: T, what: &str) -> T
where
    F: Future<Output = anyhow::Result<T>>,
{
    match fut.await {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("{what} failed, continuing without it: {e:#}");
            fallback
        }
    }
}

/// User-facing text for a completion that failed on every model.
pub fn completion_failure_message(err: &CompletionError) -> String {
    match err {
        CompletionError::RateLimited { .. } => {
            "The AI service is currently rate limited. Please wait a minute and try again."
                .to_string()
        }
        CompletionError::Blocked(_) => {
            "The AI provider declined to answer this request. Try rephrasing the question."
                .to_string()
        }
        _ => "I encountered an error while analyzing the code. Please try again.".to_string(),
    }
}

/// First `max` characters of `text`.
pub(crate) fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// What a mode handler produces before it is wrapped into an [`AskResponse`].
#[derive(Debug, Default)]
pub(crate) struct ModeAnswer {
    pub answer: String,
    pub context: Option<Vec<CodeChunk>>,
    pub timeline: Option<TimelineSummary>,
}

impl ModeAnswer {
    pub fn text(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            ..Self::default()
        }
    }
}

/// The capabilities a question is answered with.
pub struct QueryEngine {
    registry: Arc<RepoRegistry>,
    cache: Arc<ReportCache>,
    embedder: Arc<dyn Embedder>,
    vectors: Arc<dyn VectorIndex>,
    source: Arc<dyn SourceControl>,
    completer: Arc<ResilientCompleter>,
    expander: KeywordExpander,
}

impl QueryEngine {
    pub fn new(
        registry: Arc<RepoRegistry>,
        cache: Arc<ReportCache>,
        embedder: Arc<dyn Embedder>,
        vectors: Arc<dyn VectorIndex>,
        source: Arc<dyn SourceControl>,
        completer: Arc<ResilientCompleter>,
        expander: KeywordExpander,
    ) -> Self {
        Self {
            registry,
            cache,
            embedder,
            vectors,
            source,
            completer,
            expander,
        }
    }

    pub async fn answer(&self, query: &str) -> AskResponse {
        let query = query.trim();
        if query.is_empty() {
            return AskResponse::message(NO_QUESTION);
        }

        let Some(repo_name) = parse_repo_token(query) else {
            return AskResponse::message(NO_REPO_TOKEN);
        };

        let Some(repo) = self.registry.lookup(&repo_name) else {
            let available: Vec<String> =
                self.registry.list_all().into_iter().map(|r| r.name).collect();
            tracing::info!("Unknown repository @{repo_name}");
            return AskResponse::message(unknown_repo_message(&repo_name, &available));
        };

        let clean = clean_query(query);
        let mode = intent::classify(&clean);
        tracing::info!("Answering {mode} question for {}: {clean}", repo.name);

        let result = match mode {
            Mode::Timeline => timeline::answer(self, &repo, &clean).await,
            Mode::Flow => flow::answer(self, &repo, &clean).await,
            Mode::Command => command::answer(self, &repo, &clean).await,
            Mode::Test | Mode::Security | Mode::Health => {
                reports::answer(self, &repo, &clean, mode).await
            }
            Mode::Debug => debug::answer(self, &repo, &clean).await,
        };

        AskResponse {
            mode: Some(mode),
            repo: Some(repo.name),
            mermaid: extract_mermaid(&result.answer),
            answer: result.answer,
            context: result.context,
            timeline: result.timeline,
        }
    }

    /// Onboarding guide for a registered repository, cached like the
    /// other reports. `Err` carries the user-facing failure notice.
    pub async fn onboarding_report(&self, repo: &RepoRef) -> Result<String, String> {
        tracing::info!("Onboarding report requested for {}", repo.name);
        reports::generate(self, repo, ReportType::Onboarding, "").await
    }

    /// Run a prompt through the resilient caller; failures become a notice.
    async fn complete(&self, prompt: &str) -> Result<String, String> {
        self.completer
            .complete(prompt)
            .await
            .map_err(|e| completion_failure_message(&e))
    }
}
