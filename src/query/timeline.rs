//! Commit-history answers.
//!
//! Resolution order: an explicit file name in the question, then keyword
//! based detection against the file tree (with code search as the last
//! resort), then repository-level requests (last commit, commit count,
//! message search, recent history).

use chrono::DateTime;
use regex::Regex;
use std::sync::LazyLock;

use super::keywords::{extract_keywords, STOPWORDS};
use super::{try_or_default, ModeAnswer, QueryEngine};
use crate::git::{basename, resolve_file_by_name};
use crate::models::{CommitInfo, FileCommit, RepoFile, RepoRef, TimelineSummary};

pub const NO_HISTORY: &str = "This repository has no commit history.";

const FILE_COMMIT_LIMIT: usize = 20;
const RECENT_PREVIEW: usize = 5;
const HISTORY_LIMIT: usize = 20;
const MESSAGE_SEARCH_LIMIT: usize = 50;
/// One page of the commits API; the count reported from it is approximate.
const COUNT_PAGE_SIZE: usize = 100;
const DETAIL_FILES_SHOWN: usize = 10;

static FILE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w./-]*\w\.[A-Za-z][A-Za-z0-9]{0,9}$").expect("valid regex")
});

/// Extensions a token must end in to be read as a file name.
const FILE_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "mjs", "cjs", "py", "rb", "go", "rs", "java", "kt", "kts", "swift",
    "c", "h", "cc", "cpp", "hpp", "cs", "php", "scala", "sh", "bash", "sql", "html", "htm", "css",
    "scss", "sass", "less", "vue", "svelte", "astro", "json", "yml", "yaml", "toml", "ini", "cfg",
    "conf", "env", "example", "xml", "md", "mdx", "txt", "lock", "gradle", "proto", "graphql",
    "gql", "tf", "dart", "ex", "exs", "hs", "lua", "prisma",
];

/// Libraries conventionally written as `name.js`; not files.
const JS_LIBRARY_NAMES: &[&str] = &[
    "next", "node", "vue", "react", "nuxt", "express", "three", "chart", "d3", "socket", "ember",
    "backbone", "angular", "alpine", "solid", "nest",
];

static LAST_COMMIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:last|latest|most\s+recent|newest)\s+commit\b").expect("valid regex")
});

static HOW_MANY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bhow\s+many\s+commits?\b").expect("valid regex"));

static MESSAGE_SEARCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:mentioning|containing|about|with\s+message)\s+["'`]?([\w.-]+)"#)
        .expect("valid regex")
});

static HISTORY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:history|log|commits|recent\s+changes|timeline)\b").expect("valid regex")
});

pub fn file_not_found(file_name: &str) -> String {
    format!("The file \"{file_name}\" does not exist in this repository.")
}

pub fn file_without_history(path: &str) -> String {
    format!("This file exists ({path}), but commit history is not available from GitHub.")
}

/// A token in the query that looks like a file name (`login.ts`, `src/app.py`).
pub fn explicit_file_token(query: &str) -> Option<String> {
    const WRAPPERS: &str = "\"'`()[]{}<>,;:!?";
    query
        .split_whitespace()
        .map(|t| t.trim_start_matches(|c: char| WRAPPERS.contains(c)))
        .map(|t| t.trim_end_matches(|c: char| c == '.' || WRAPPERS.contains(c)))
        .find(|t| FILE_TOKEN.is_match(t) && names_a_file(t))
        .map(str::to_string)
}

fn names_a_file(token: &str) -> bool {
    let lower = token.to_lowercase();
    let Some((stem, ext)) = lower.rsplit_once('.') else {
        return false;
    };
    if ext == "js" && !stem.contains('/') && JS_LIBRARY_NAMES.contains(&stem) {
        return false;
    }
    FILE_EXTENSIONS.contains(&ext)
}

/// Best file for a set of search terms: the first term that names a file
/// wins; an exact stem match beats a substring match, shorter paths win ties.
pub fn fuzzy_match_file<'a>(files: &'a [RepoFile], terms: &[String]) -> Option<&'a str> {
    for term in terms {
        let term = term.to_lowercase();
        let best = files
            .iter()
            .filter_map(|f| {
                let name = basename(&f.path).to_lowercase();
                if !name.contains(&term) {
                    return None;
                }
                let stem = name.split('.').next().unwrap_or_default();
                Some((stem != term, f.path.len(), f.path.as_str()))
            })
            .min();
        if let Some((_, _, path)) = best {
            return Some(path);
        }
    }
    None
}

fn short_sha(sha: &str) -> &str {
    super::truncate_chars(sha, 7)
}

fn short_date(iso: &str) -> String {
    DateTime::parse_from_rfc3339(iso)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| iso.to_string())
}

fn subject(message: &str) -> &str {
    message.lines().next().unwrap_or_default().trim()
}

fn commit_line(c: &CommitInfo) -> String {
    format!(
        "- {} {} {}: {}",
        short_date(&c.date),
        short_sha(&c.sha),
        c.author,
        subject(&c.message)
    )
}

pub(super) async fn answer(engine: &QueryEngine, repo: &RepoRef, query: &str) -> ModeAnswer {
    // (a) explicit file name
    if let Some(token) = explicit_file_token(query) {
        let files = try_or_default(
            engine.source.list_files(&repo.url, false),
            Vec::new(),
            "File listing",
        )
        .await;
        let resolved = files
            .iter()
            .find(|f| f.path == token)
            .map(|f| f.path.as_str())
            .or_else(|| resolve_file_by_name(&files, basename(&token)));

        return match resolved {
            Some(path) => file_history(engine, repo, path).await,
            None => ModeAnswer::text(file_not_found(basename(&token))),
        };
    }

    // (b) smart detection from keywords; a commit-message needle is not a file hint
    let detection_text = MESSAGE_SEARCH.replace_all(query, " ");
    let keywords = extract_keywords(&detection_text, STOPWORDS);
    if !keywords.is_empty() {
        let terms = engine.expander.expand(&keywords).await;
        if let Some(path) = detect_file(engine, repo, &terms).await {
            return file_history(engine, repo, &path).await;
        }
    }

    // (c) repository-level requests
    repo_level(engine, repo, query).await
}

async fn detect_file(engine: &QueryEngine, repo: &RepoRef, terms: &[String]) -> Option<String> {
    let files = try_or_default(
        engine.source.list_files(&repo.url, true),
        Vec::new(),
        "File listing",
    )
    .await;
    if let Some(path) = fuzzy_match_file(&files, terms) {
        tracing::info!("Matched {terms:?} to {path}");
        return Some(path.to_string());
    }

    let top = terms.first()?;
    let hits = try_or_default(
        engine.source.search_code(&repo.url, top),
        Vec::new(),
        "Code search",
    )
    .await;
    let path = hits.into_iter().next()?;
    tracing::info!("Code search for {top:?} matched {path}");
    Some(path)
}

async fn repo_level(engine: &QueryEngine, repo: &RepoRef, query: &str) -> ModeAnswer {
    if LAST_COMMIT.is_match(query) {
        return last_commit(engine, repo).await;
    }

    if HOW_MANY.is_match(query) {
        let commits = list_commits(engine, repo, COUNT_PAGE_SIZE).await;
        if commits.is_empty() {
            return ModeAnswer::text(NO_HISTORY);
        }
        let n = commits.len();
        let qualifier = if n >= COUNT_PAGE_SIZE { "at least " } else { "" };
        return ModeAnswer::text(format!(
            "This repository has {qualifier}{n} commits (approximate: counted from the most \
             recent {COUNT_PAGE_SIZE} commits fetched)."
        ));
    }

    if let Some(caps) = MESSAGE_SEARCH.captures(query) {
        let needle = caps[1].to_lowercase();
        let commits = list_commits(engine, repo, MESSAGE_SEARCH_LIMIT).await;
        if commits.is_empty() {
            return ModeAnswer::text(NO_HISTORY);
        }
        let matching: Vec<String> = commits
            .iter()
            .filter(|c| c.message.to_lowercase().contains(&needle))
            .map(commit_line)
            .collect();
        if matching.is_empty() {
            return ModeAnswer::text(format!(
                "None of the last {} commits mention \"{needle}\".",
                commits.len()
            ));
        }
        return ModeAnswer::text(format!(
            "Commits mentioning \"{needle}\" (searched the last {}):\n{}",
            commits.len(),
            matching.join("\n")
        ));
    }

    if !HISTORY.is_match(query) {
        tracing::debug!("No file or repository request recognized, showing recent history");
    }
    let commits = list_commits(engine, repo, HISTORY_LIMIT).await;
    if commits.is_empty() {
        return ModeAnswer::text(NO_HISTORY);
    }
    let lines: Vec<String> = commits.iter().map(commit_line).collect();
    ModeAnswer::text(format!(
        "Recent commits in {}:\n{}",
        repo.name,
        lines.join("\n")
    ))
}

async fn list_commits(engine: &QueryEngine, repo: &RepoRef, limit: usize) -> Vec<CommitInfo> {
    try_or_default(
        engine.source.list_commits(&repo.url, limit),
        Vec::new(),
        "Commit listing",
    )
    .await
}

async fn last_commit(engine: &QueryEngine, repo: &RepoRef) -> ModeAnswer {
    let commits = list_commits(engine, repo, 1).await;
    let Some(latest) = commits.first() else {
        return ModeAnswer::text(NO_HISTORY);
    };

    let mut out = format!(
        "Last commit: {}\nAuthor: {}\nDate: {}\nCommit: {}\nLink: {}",
        subject(&latest.message),
        latest.author,
        short_date(&latest.date),
        short_sha(&latest.sha),
        latest.html_url
    );

    let details = try_or_default(
        engine.source.commit_details(&repo.url, &latest.sha),
        None,
        "Commit details",
    )
    .await;
    if let Some(details) = details {
        out.push_str(&format!(
            "\n\nChanges: {} files changed, +{} -{}",
            details.files.len(),
            details.stats.additions,
            details.stats.deletions
        ));
        for f in details.files.iter().take(DETAIL_FILES_SHOWN) {
            out.push_str(&format!(
                "\n- {} {} (+{} -{})",
                f.status, f.filename, f.additions, f.deletions
            ));
        }
        if details.files.len() > DETAIL_FILES_SHOWN {
            out.push_str(&format!(
                "\n...and {} more files",
                details.files.len() - DETAIL_FILES_SHOWN
            ));
        }
    }

    ModeAnswer::text(out)
}

fn describe(label: &str, c: &FileCommit) -> String {
    format!(
        "{label}: {} by {} ({}) {}",
        short_date(&c.date),
        c.author_name,
        short_sha(&c.sha),
        c.html_url
    )
}

/// Provider order is newest first: the last element is the oldest commit.
async fn file_history(engine: &QueryEngine, repo: &RepoRef, path: &str) -> ModeAnswer {
    let commits = try_or_default(
        engine.source.file_commits(&repo.url, path, FILE_COMMIT_LIMIT),
        Vec::new(),
        "File history",
    )
    .await;

    let (Some(newest), Some(oldest)) = (commits.first(), commits.last()) else {
        return ModeAnswer::text(file_without_history(path));
    };

    let recent: Vec<FileCommit> = commits.iter().take(RECENT_PREVIEW).cloned().collect();
    let mut out = format!(
        "File: {path}\n{}\n{}\nTotal commits touching this file: {}\n\nRecent history:",
        describe("First added", oldest),
        describe("Last modified", newest),
        commits.len()
    );
    for c in &recent {
        out.push_str(&format!(
            "\n- {} {}: {} ({})",
            short_date(&c.date),
            c.author_name,
            subject(&c.message),
            short_sha(&c.sha)
        ));
    }

    let summary = TimelineSummary {
        file: path.to_string(),
        first_commit: Some(oldest.clone()),
        last_commit: Some(newest.clone()),
        total_commits: commits.len(),
        recent,
    };

    ModeAnswer {
        answer: out,
        context: None,
        timeline: Some(summary),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(paths: &[&str]) -> Vec<RepoFile> {
        paths
            .iter()
            .map(|p| RepoFile {
                path: p.to_string(),
            })
            .collect()
    }

    fn terms(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_explicit_file_token() {
        assert_eq!(explicit_file_token("when was login.ts added?").as_deref(), Some("login.ts"));
        assert_eq!(
            explicit_file_token("history of \"src/app.py\".").as_deref(),
            Some("src/app.py")
        );
        assert_eq!(explicit_file_token("what changed in v1.2"), None);
        assert_eq!(explicit_file_token("show the last commit"), None);
    }

    #[test]
    fn test_file_token_needs_known_extension() {
        assert_eq!(explicit_file_token("when did we move to next.js"), None);
        assert_eq!(explicit_file_token("when was auth added, e.g. signup"), None);
        assert_eq!(explicit_file_token("history of Node.js support"), None);
        assert_eq!(
            explicit_file_token("when was pages/next.js added").as_deref(),
            Some("pages/next.js")
        );
        assert_eq!(explicit_file_token("who changed Cargo.toml").as_deref(), Some("Cargo.toml"));
        assert_eq!(explicit_file_token("history of .env.example").as_deref(), Some(".env.example"));
    }

    #[test]
    fn test_fuzzy_match_prefers_exact_stem_then_short_path() {
        let tree = files(&["src/components/LoginForm.tsx", "src/login.ts", "lib/deep/login.ts"]);
        assert_eq!(fuzzy_match_file(&tree, &terms(&["login"])), Some("src/login.ts"));
    }

    #[test]
    fn test_fuzzy_match_walks_terms_in_order() {
        let tree = files(&["src/session.ts", "src/auth.ts"]);
        assert_eq!(
            fuzzy_match_file(&tree, &terms(&["signin", "auth", "session"])),
            Some("src/auth.ts")
        );
        assert_eq!(fuzzy_match_file(&tree, &terms(&["payment"])), None);
    }

    #[test]
    fn test_fallback_strings() {
        assert_eq!(
            file_not_found("login.ts"),
            "The file \"login.ts\" does not exist in this repository."
        );
        assert_eq!(
            file_without_history("src/login.ts"),
            "This file exists (src/login.ts), but commit history is not available from GitHub."
        );
    }

    #[test]
    fn test_short_date() {
        assert_eq!(short_date("2024-01-05T10:00:00Z"), "2024-01-05");
        assert_eq!(short_date("yesterday"), "yesterday");
    }

    #[test]
    fn test_repo_level_patterns() {
        assert!(LAST_COMMIT.is_match("what was the last commit"));
        assert!(HOW_MANY.is_match("how many commits are there"));
        let caps = MESSAGE_SEARCH.captures("commits mentioning 'payment'").unwrap();
        assert_eq!(&caps[1], "payment");
        assert!(HISTORY.is_match("show the commit history"));
    }
}
