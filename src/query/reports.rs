//! Cached long-form reports: test plan, security audit, code health and
//! the onboarding guide.

use super::flow::code_context;
use super::intent::Mode;
use super::prompts::report_prompt;
use super::{truncate_chars, try_or_default, ModeAnswer, QueryEngine};
use crate::cache::ReportType;
use crate::llm::sanitize::sanitize;
use crate::models::{RepoFile, RepoRef};

const TREE_ENTRIES: usize = 50;
const KEY_FILE_CHARS: usize = 5_000;
const ONBOARDING_TREE_ENTRIES: usize = 500;
const ONBOARDING_FILE_CHARS: usize = 10_000;
const SAMPLE_CHUNKS: usize = 5;
const SAMPLE_CONTEXT_CHARS: usize = 10_000;

/// Manifests, build configs, entrypoints and env templates, matched
/// case-insensitively against full paths.
pub const KEY_FILES: &[&str] = &[
    "README.md",
    "package.json",
    "tsconfig.json",
    "next.config.js",
    "next.config.ts",
    "vite.config.ts",
    "vite.config.js",
    "app/page.tsx",
    "app/layout.tsx",
    "src/App.tsx",
    "src/index.tsx",
    "src/main.tsx",
    "index.js",
    "server.js",
    "requirements.txt",
    "pyproject.toml",
    "main.py",
    "app.py",
    "Cargo.toml",
    "go.mod",
    "Dockerfile",
    "docker-compose.yml",
    ".env.example",
];

fn report_type(mode: Mode) -> ReportType {
    match mode {
        Mode::Security => ReportType::SecurityAudit,
        Mode::Health => ReportType::CodeHealth,
        _ => ReportType::TestPlan,
    }
}

/// `(tree entries, chars per key file)` of the context for a report.
fn context_limits(report_type: ReportType) -> (usize, usize) {
    match report_type {
        ReportType::Onboarding => (ONBOARDING_TREE_ENTRIES, ONBOARDING_FILE_CHARS),
        _ => (TREE_ENTRIES, KEY_FILE_CHARS),
    }
}

fn tree_summary(files: &[RepoFile], max_entries: usize) -> String {
    let mut out: Vec<String> = files
        .iter()
        .take(max_entries)
        .map(|f| f.path.clone())
        .collect();
    if files.len() > max_entries {
        out.push(format!("...(and {} more files)", files.len() - max_entries));
    }
    out.join("\n")
}

fn truncate_file(content: &str, max_chars: usize) -> String {
    let kept = truncate_chars(content, max_chars);
    if kept.len() < content.len() {
        format!("{kept}\n...(truncated)")
    } else {
        kept.to_string()
    }
}

pub(super) async fn answer(
    engine: &QueryEngine,
    repo: &RepoRef,
    query: &str,
    mode: Mode,
) -> ModeAnswer {
    match generate(engine, repo, report_type(mode), query).await {
        Ok(report) | Err(report) => ModeAnswer::text(report),
    }
}

/// A cached or freshly generated report. `Err` carries the user-facing
/// notice when the completion failed; failures are never cached.
pub(super) async fn generate(
    engine: &QueryEngine,
    repo: &RepoRef,
    report_type: ReportType,
    query: &str,
) -> Result<String, String> {
    if let Some(cached) = engine.cache.get(&repo.name, report_type) {
        tracing::info!("Serving cached {} report for {}", report_type.as_str(), repo.name);
        return Ok(cached);
    }

    let (tree_entries, file_chars) = context_limits(report_type);

    let files = try_or_default(
        engine.source.list_files(&repo.url, false),
        Vec::new(),
        "File listing",
    )
    .await;
    let mut context = format!(
        "File structure:\n{}\n\n",
        tree_summary(&files, tree_entries)
    );

    let mut fetched = 0usize;
    for key in KEY_FILES {
        let Some(file) = files.iter().find(|f| f.path.eq_ignore_ascii_case(key)) else {
            continue;
        };
        let content = try_or_default(
            engine.source.read_file(&repo.url, &file.path),
            String::new(),
            "Key file read",
        )
        .await;
        if content.is_empty() {
            continue;
        }
        context.push_str(&format!(
            "File: {}\nContent:\n{}\n\n---\n\n",
            file.path,
            truncate_file(&content, file_chars)
        ));
        fetched += 1;
    }

    if matches!(report_type, ReportType::SecurityAudit | ReportType::CodeHealth) {
        let vector = engine.embedder.embed(query).await;
        let sample = try_or_default(
            engine
                .vectors
                .search(&repo.collection_name, &vector, SAMPLE_CHUNKS),
            Vec::new(),
            "Vector search",
        )
        .await;
        if !sample.is_empty() {
            context.push_str("Code samples:\n");
            context.push_str(&code_context(&sample, SAMPLE_CONTEXT_CHARS));
        }
    }

    tracing::info!(
        "Generating {} report for {} ({fetched} key files)",
        report_type.as_str(),
        repo.name
    );

    let prompt = report_prompt(report_type, &repo.name, &context);
    let report = sanitize(&engine.complete(&prompt).await?);
    engine.cache.save(&repo.name, report_type, &report);
    Ok(report)
}
