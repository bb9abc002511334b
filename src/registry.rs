use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;

use crate::models::RepoRef;
use crate::store::KeyValueStore;

const REPO_KEY_PREFIX: &str = "repo:";

/// Vector collection name for a repository: `code_chunks_` followed by the
/// lowercased name with every non-alphanumeric character replaced by `_`.
pub fn collection_name(repo_name: &str) -> String {
    let sanitized: String = repo_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("code_chunks_{sanitized}")
}

/// Name-addressed registry of repositories the user can ask about.
pub struct RepoRegistry {
    store: Arc<dyn KeyValueStore>,
}

impl RepoRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn key(name: &str) -> String {
        format!("{REPO_KEY_PREFIX}{}", name.to_lowercase())
    }

    /// Case-insensitive lookup by display name.
    pub fn lookup(&self, name: &str) -> Option<RepoRef> {
        let raw = self.store.get(&Self::key(name))?;
        match serde_json::from_str(&raw) {
            Ok(repo) => Some(repo),
            Err(e) => {
                tracing::warn!("Ignoring malformed registry entry for {name}: {e}");
                None
            }
        }
    }

    /// All registered repositories, oldest first.
    pub fn list_all(&self) -> Vec<RepoRef> {
        let mut repos: Vec<RepoRef> = self
            .store
            .keys(REPO_KEY_PREFIX)
            .iter()
            .filter_map(|key| self.store.get(key))
            .filter_map(|raw| serde_json::from_str(&raw).ok())
            .collect();
        repos.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        repos
    }

    /// An existing repo that `name` would clash with: same name ignoring
    /// case, or a different name mapping to the same collection.
    pub fn conflict(&self, name: &str) -> Option<RepoRef> {
        if let Some(repo) = self.lookup(name) {
            return Some(repo);
        }
        let collection = collection_name(name);
        self.list_all()
            .into_iter()
            .find(|r| r.collection_name == collection)
    }

    pub fn add(&self, name: &str, url: &str) -> Result<RepoRef> {
        let name = name.trim();
        if name.is_empty() {
            anyhow::bail!("Repo name is required");
        }
        if let Some(existing) = self.conflict(name) {
            anyhow::bail!(
                "Repo {name} conflicts with {} (collection {})",
                existing.name,
                existing.collection_name
            );
        }

        let repo = RepoRef {
            name: name.to_string(),
            url: url.to_string(),
            collection_name: collection_name(name),
            created_at: Utc::now(),
        };
        let data = serde_json::to_string(&repo)?;
        self.store
            .set(&Self::key(name), data, None)
            .context("Failed to save repo registry entry")?;
        Ok(repo)
    }

    /// Removes a repository. Returns `false` if it was not registered.
    pub fn remove(&self, name: &str) -> Result<bool> {
        if self.lookup(name).is_none() {
            return Ok(false);
        }
        self.store.delete(&Self::key(name))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn registry() -> RepoRegistry {
        RepoRegistry::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_collection_name_sanitizes() {
        assert_eq!(collection_name("SweetCrave"), "code_chunks_sweetcrave");
        assert_eq!(collection_name("my-repo.v2"), "code_chunks_my_repo_v2");
    }

    #[test]
    fn test_add_and_lookup_case_insensitive() {
        let reg = registry();
        let repo = reg.add("Demo", "https://github.com/acme/demo").unwrap();
        assert_eq!(repo.collection_name, "code_chunks_demo");

        let found = reg.lookup("demo").unwrap();
        assert_eq!(found.name, "Demo");
        assert_eq!(found.url, "https://github.com/acme/demo");
    }

    #[test]
    fn test_add_rejects_duplicates() {
        let reg = registry();
        reg.add("demo", "https://github.com/a/demo").unwrap();
        assert!(reg.add("DEMO", "https://github.com/b/demo").is_err());
    }

    #[test]
    fn test_add_rejects_shared_collection() {
        let reg = registry();
        reg.add("my-repo", "https://github.com/a/my-repo").unwrap();
        assert!(reg.add("my_repo", "https://github.com/b/my_repo").is_err());
        assert!(reg.add("my.repo", "https://github.com/c/my.repo").is_err());
        assert_eq!(reg.conflict("MY_REPO").unwrap().name, "my-repo");
        assert!(reg.conflict("my-repo2").is_none());
        assert_eq!(reg.list_all().len(), 1);
    }

    #[test]
    fn test_list_all_in_creation_order() {
        let reg = registry();
        reg.add("zeta", "https://github.com/a/zeta").unwrap();
        reg.add("alpha", "https://github.com/a/alpha").unwrap();
        let names: Vec<String> = reg.list_all().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_remove() {
        let reg = registry();
        reg.add("demo", "https://github.com/a/demo").unwrap();
        assert!(reg.remove("Demo").unwrap());
        assert!(!reg.remove("demo").unwrap());
        assert!(reg.lookup("demo").is_none());
    }
}
