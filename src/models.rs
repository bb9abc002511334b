use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::query::intent::Mode;

/// A registered repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepoRef {
    pub name: String,
    pub url: String,
    pub collection_name: String,
    pub created_at: DateTime<Utc>,
}

/// A retrievable slice of a source file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodeChunk {
    pub id: String,
    pub text: String,
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// A file entry from the repository tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepoFile {
    pub path: String,
}

/// One commit from the repository-wide history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommitInfo {
    pub sha: String,
    pub author: String,
    /// ISO-8601 author date
    pub date: String,
    pub message: String,
    pub html_url: String,
}

/// One commit that touched a specific file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileCommit {
    pub sha: String,
    pub author_name: String,
    pub author_email: Option<String>,
    pub date: String,
    pub message: String,
    pub html_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CommitStats {
    pub total: u64,
    pub additions: u64,
    pub deletions: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommitFileChange {
    pub filename: String,
    /// "added", "modified", "removed", ...
    pub status: String,
    pub additions: u64,
    pub deletions: u64,
}

/// A single commit with its diff statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommitDetails {
    pub sha: String,
    pub message: String,
    pub author: String,
    pub date: String,
    pub html_url: String,
    pub stats: CommitStats,
    pub files: Vec<CommitFileChange>,
}

/// Structured file history attached to timeline answers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSummary {
    pub file: String,
    pub first_commit: Option<FileCommit>,
    pub last_commit: Option<FileCommit>,
    pub total_commits: usize,
    pub recent: Vec<FileCommit>,
}

/// Ask request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub query: String,
}

/// Ask response. `mode` is `None` when the query was rejected before
/// classification (no question, no `@Repo`, unknown repo).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AskResponse {
    pub mode: Option<Mode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mermaid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<CodeChunk>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<TimelineSummary>,
}

impl AskResponse {
    /// A plain answer with no mode, repo, or attachments.
    pub fn message(answer: impl Into<String>) -> Self {
        Self {
            mode: None,
            repo: None,
            answer: answer.into(),
            mermaid: None,
            context: None,
            timeline: None,
        }
    }
}

/// Repository metadata shown next to a registered repo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepoStats {
    pub name: String,
    pub description: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub open_issues: u64,
    pub last_update: String,
    pub pushed_at: String,
    /// Size in KB, as reported by GitHub
    pub size: u64,
    pub default_branch: String,
}

/// Onboarding request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardRequest {
    #[serde(default)]
    pub repo_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OnboardResponse {
    pub report: String,
}

/// Add-repo request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRepoRequest {
    pub url: String,
    pub display_name: Option<String>,
}
