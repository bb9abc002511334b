use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{is_listable_file, parse_github_repo, SourceControl};
use crate::config::GitHubConfig;
use crate::models::{
    CommitDetails, CommitFileChange, CommitInfo, CommitStats, FileCommit, RepoFile, RepoStats,
};

const API_VERSION: &str = "2022-11-28";
const CODE_SEARCH_RESULTS: usize = 5;

/// [`SourceControl`] over the GitHub REST v3 API.
pub struct GitHubClient {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(client: reqwest::Client, config: &GitHubConfig) -> Self {
        Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let req = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, concat!("repo-ask/", env!("CARGO_PKG_VERSION")))
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// GET and decode JSON; `Ok(None)` on 404.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>> {
        let resp = self
            .request(url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to reach GitHub API at {url}"))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("GitHub API returned {status}: {body}");
        }

        let body = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse GitHub response from {url}"))?;
        Ok(Some(body))
    }

    fn repo_url(&self, repo_url: &str) -> Result<String> {
        let (owner, repo) = parse_github_repo(repo_url)?;
        Ok(format!("{}/repos/{owner}/{repo}", self.api_url))
    }

    /// Contents URL with every segment of `path` percent-encoded.
    fn contents_url(&self, repo_url: &str, path: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.repo_url(repo_url)?)
            .context("Invalid GitHub API URL")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("GitHub API URL cannot take a path"))?
            .push("contents")
            .extend(path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }
}

// ─── Wire types ──────────────────────────────────────────

#[derive(Deserialize)]
struct RepoMeta {
    default_branch: String,
}

#[derive(Deserialize)]
struct RepoDetails {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    #[serde(default)]
    open_issues_count: u64,
    #[serde(default)]
    updated_at: String,
    #[serde(default)]
    pushed_at: String,
    #[serde(default)]
    size: u64,
    default_branch: String,
}

#[derive(Deserialize)]
struct Tree {
    tree: Vec<TreeNode>,
}

#[derive(Deserialize)]
struct TreeNode {
    #[serde(default)]
    path: Option<String>,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct Contents {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct CommitItem {
    sha: String,
    html_url: String,
    commit: CommitBody,
    #[serde(default)]
    stats: Option<WireStats>,
    #[serde(default)]
    files: Option<Vec<WireFile>>,
}

#[derive(Deserialize)]
struct CommitBody {
    message: String,
    #[serde(default)]
    author: Option<CommitAuthor>,
}

#[derive(Deserialize)]
struct CommitAuthor {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Deserialize)]
struct WireStats {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
}

#[derive(Deserialize)]
struct WireFile {
    filename: String,
    status: String,
    #[serde(default)]
    additions: u64,
    #[serde(default)]
    deletions: u64,
}

#[derive(Deserialize)]
struct SearchResults {
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    path: String,
}

impl CommitItem {
    fn author_name(&self) -> String {
        self.commit
            .author
            .as_ref()
            .and_then(|a| a.name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    fn date(&self) -> String {
        self.commit
            .author
            .as_ref()
            .and_then(|a| a.date.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SourceControl for GitHubClient {
    async fn list_files(&self, repo_url: &str, filtered: bool) -> Result<Vec<RepoFile>> {
        let base = self.repo_url(repo_url)?;

        let meta: RepoMeta = self
            .get_json(&base, &[])
            .await?
            .with_context(|| format!("Repository not found: {repo_url}"))?;

        let tree: Tree = self
            .get_json(
                &format!("{base}/git/trees/{}", meta.default_branch),
                &[("recursive", "1".to_string())],
            )
            .await?
            .with_context(|| format!("No tree for branch {}", meta.default_branch))?;

        Ok(tree
            .tree
            .into_iter()
            .filter(|node| node.kind == "blob")
            .filter_map(|node| node.path)
            .filter(|path| !filtered || is_listable_file(path))
            .map(|path| RepoFile { path })
            .collect())
    }

    async fn read_file(&self, repo_url: &str, path: &str) -> Result<String> {
        let base = self.repo_url(repo_url)?;
        let url = self.contents_url(repo_url, path)?;
        let contents: Contents = self
            .get_json(url.as_str(), &[])
            .await?
            .with_context(|| format!("File not found: {path}"))?;

        let encoded = match (contents.kind.as_str(), contents.content) {
            ("file", Some(content)) => content,
            _ => bail!("Not a file or no content: {path}"),
        };

        // GitHub wraps base64 content at 60 columns
        let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = STANDARD
            .decode(cleaned)
            .with_context(|| format!("Invalid base64 content for {path}"))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn list_commits(&self, repo_url: &str, limit: usize) -> Result<Vec<CommitInfo>> {
        let base = self.repo_url(repo_url)?;
        let items: Vec<CommitItem> = self
            .get_json(&format!("{base}/commits"), &[("per_page", limit.to_string())])
            .await?
            .unwrap_or_default();

        Ok(items
            .into_iter()
            .map(|c| CommitInfo {
                author: c.author_name(),
                date: c.date(),
                sha: c.sha,
                message: c.commit.message,
                html_url: c.html_url,
            })
            .collect())
    }

    async fn file_commits(
        &self,
        repo_url: &str,
        path: &str,
        limit: usize,
    ) -> Result<Vec<FileCommit>> {
        let base = self.repo_url(repo_url)?;
        let items: Vec<CommitItem> = self
            .get_json(
                &format!("{base}/commits"),
                &[("path", path.to_string()), ("per_page", limit.to_string())],
            )
            .await?
            .unwrap_or_default();

        Ok(items
            .into_iter()
            .map(|c| FileCommit {
                author_name: c.author_name(),
                author_email: c.commit.author.as_ref().and_then(|a| a.email.clone()),
                date: c.date(),
                sha: c.sha,
                message: c.commit.message,
                html_url: c.html_url,
            })
            .collect())
    }

    async fn commit_details(&self, repo_url: &str, sha: &str) -> Result<Option<CommitDetails>> {
        let base = self.repo_url(repo_url)?;
        let Some(c) = self
            .get_json::<CommitItem>(&format!("{base}/commits/{sha}"), &[])
            .await?
        else {
            return Ok(None);
        };

        let stats = c
            .stats
            .as_ref()
            .map(|s| CommitStats {
                total: s.total,
                additions: s.additions,
                deletions: s.deletions,
            })
            .unwrap_or_default();
        let files = c
            .files
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|f| CommitFileChange {
                filename: f.filename.clone(),
                status: f.status.clone(),
                additions: f.additions,
                deletions: f.deletions,
            })
            .collect();

        Ok(Some(CommitDetails {
            author: c.author_name(),
            date: c.date(),
            sha: c.sha,
            message: c.commit.message,
            html_url: c.html_url,
            stats,
            files,
        }))
    }

    async fn search_code(&self, repo_url: &str, term: &str) -> Result<Vec<String>> {
        let (owner, repo) = parse_github_repo(repo_url)?;
        let results: SearchResults = self
            .get_json(
                &format!("{}/search/code", self.api_url),
                &[
                    ("q", format!("{term} repo:{owner}/{repo}")),
                    ("per_page", CODE_SEARCH_RESULTS.to_string()),
                ],
            )
            .await?
            .with_context(|| format!("Code search unavailable for {owner}/{repo}"))?;

        Ok(results.items.into_iter().map(|i| i.path).collect())
    }

    async fn repo_stats(&self, repo_url: &str) -> Result<Option<RepoStats>> {
        let base = self.repo_url(repo_url)?;
        let Some(d) = self.get_json::<RepoDetails>(&base, &[]).await? else {
            return Ok(None);
        };
        Ok(Some(RepoStats {
            name: d.name,
            description: d.description,
            stars: d.stargazers_count,
            forks: d.forks_count,
            open_issues: d.open_issues_count,
            last_update: d.updated_at,
            pushed_at: d.pushed_at,
            size: d.size,
            default_branch: d.default_branch,
        }))
    }
}
