//! Source-control access: the capability trait, the GitHub implementation,
//! and path helpers shared by the query handlers.

pub mod github;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

use crate::models::{CommitDetails, CommitInfo, FileCommit, RepoFile, RepoStats};

/// Extensions dropped from filtered listings: binaries, media, archives and prose.
const SKIPPED_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "svg", "mp4", "mp3", "ico", "exe", "pdf", "zip", "tar",
    "gz", "7z", "rar", "jar", "war", "ear", "class", "pyc", "woff", "woff2", "ttf", "eot", "md",
    "txt", "rtf", "docx", "doc", "odt",
];

/// Basenames (before the first '.') dropped from filtered listings.
const SKIPPED_BASENAMES: &[&str] = &[
    "license",
    "changelog",
    "contributing",
    "readme",
    "notice",
    "authors",
    "patents",
    "copying",
];

static GITHUB_REPO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"github\.com/([^/]+)/([^/]+)").expect("valid regex"));

#[async_trait]
pub trait SourceControl: Send + Sync {
    /// Every file in the default branch. `filtered` drops binaries and docs.
    async fn list_files(&self, repo_url: &str, filtered: bool) -> Result<Vec<RepoFile>>;

    async fn read_file(&self, repo_url: &str, path: &str) -> Result<String>;

    /// Most recent commits, newest first.
    async fn list_commits(&self, repo_url: &str, limit: usize) -> Result<Vec<CommitInfo>>;

    /// Most recent commits touching `path`, newest first.
    async fn file_commits(&self, repo_url: &str, path: &str, limit: usize)
        -> Result<Vec<FileCommit>>;

    /// `None` when the commit does not exist.
    async fn commit_details(&self, repo_url: &str, sha: &str) -> Result<Option<CommitDetails>>;

    /// Paths of files whose content matches `term`.
    async fn search_code(&self, repo_url: &str, term: &str) -> Result<Vec<String>>;

    /// `None` when the repository does not exist.
    async fn repo_stats(&self, repo_url: &str) -> Result<Option<RepoStats>>;
}

/// Split a GitHub URL into `(owner, repo)`.
pub fn parse_github_repo(url: &str) -> Result<(String, String)> {
    let caps = GITHUB_REPO
        .captures(url)
        .with_context(|| format!("Invalid GitHub URL: {url}"))?;
    let repo = caps[2].trim_end_matches(".git").to_string();
    Ok((caps[1].to_string(), repo))
}

pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Whether a path survives the filtered listing.
pub fn is_listable_file(path: &str) -> bool {
    let file_name = basename(path).to_lowercase();
    if file_name.is_empty() {
        return false;
    }

    let stem = file_name.split('.').next().unwrap_or_default();
    if SKIPPED_BASENAMES.contains(&stem) {
        return false;
    }

    match file_name.rsplit_once('.') {
        Some((_, ext)) => !SKIPPED_EXTENSIONS.contains(&ext),
        // Extensionless files (Dockerfile, Makefile) are kept
        None => true,
    }
}

/// Resolve a bare file name to a path in `files`: exact basename match,
/// preferring a file at the repository root, otherwise the first match.
pub fn resolve_file_by_name<'a>(files: &'a [RepoFile], file_name: &str) -> Option<&'a str> {
    let mut matches = files.iter().filter(|f| basename(&f.path) == file_name);
    let first = matches.next()?;
    if first.path == file_name {
        return Some(first.path.as_str());
    }
    let root = matches.find(|f| f.path == file_name).unwrap_or(first);
    Some(root.path.as_str())
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

    #[test]
    fn test_parse_github_repo() {
        let (owner, repo) = parse_github_repo("https://github.com/acme/widgets.git").unwrap();
        assert_eq!(owner, "acme");
        assert_eq!(repo, "widgets");
        assert!(parse_github_repo("https://gitlab.com/acme/widgets").is_err());
    }

    #[test]
    fn test_listable_files() {
        assert!(is_listable_file("src/login.ts"));
        assert!(is_listable_file("Dockerfile"));
        assert!(!is_listable_file("LICENSE"));
        assert!(!is_listable_file("docs/CHANGELOG.md"));
        assert!(!is_listable_file("README.rst"));
        assert!(!is_listable_file("assets/logo.PNG"));
        assert!(!is_listable_file("notes.txt"));
    }

    #[test]
    fn test_resolve_prefers_root_match() {
        let tree = files(&["src/config.ts", "config.ts", "lib/config.ts"]);
        assert_eq!(resolve_file_by_name(&tree, "config.ts"), Some("config.ts"));
    }

    #[test]
    fn test_resolve_falls_back_to_first_match() {
        let tree = files(&["src/login.ts", "test/login.ts"]);
        assert_eq!(resolve_file_by_name(&tree, "login.ts"), Some("src/login.ts"));
        assert_eq!(resolve_file_by_name(&tree, "logout.ts"), None);
    }

    #[test]
    fn test_resolve_is_exact_on_basename() {
        let tree = files(&["src/mylogin.ts"]);
        assert_eq!(resolve_file_by_name(&tree, "login.ts"), None);
    }
}
