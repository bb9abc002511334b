use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::store::KeyValueStore;

/// Reports are regenerated at most once a day per repository.
pub const DEFAULT_REPORT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Long-form reports that depend only on the repository, never on the
/// question, and can therefore be cached by `(repo, type)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportType {
    TestPlan,
    SecurityAudit,
    CodeHealth,
    Onboarding,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::TestPlan => "test-plan",
            ReportType::SecurityAudit => "security-audit",
            ReportType::CodeHealth => "code-health",
            ReportType::Onboarding => "onboarding",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedReport {
    pub repo_name: String,
    pub report_type: ReportType,
    pub content: String,
    pub stored_at: DateTime<Utc>,
}

pub struct ReportCache {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl ReportCache {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn key(repo_name: &str, report_type: ReportType) -> String {
        let safe: String = repo_name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!("report:{safe}_{}", report_type.as_str())
    }

    /// Returns the cached report content if it was stored less than `ttl` ago.
    pub fn get(&self, repo_name: &str, report_type: ReportType) -> Option<String> {
        let raw = self.store.get(&Self::key(repo_name, report_type))?;
        let report: CachedReport = match serde_json::from_str(&raw) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Discarding unreadable cached report for {repo_name}: {e}");
                return None;
            }
        };

        let age = Utc::now().signed_duration_since(report.stored_at);
        let fresh = age
            .to_std()
            .map(|age| age < self.ttl)
            // stored_at in the future (clock skew) still counts as fresh
            .unwrap_or(true);
        fresh.then_some(report.content)
    }

    /// Stores (or overwrites) a report. Failures are logged, not returned:
    /// a report that can't be cached is still a valid answer.
    pub fn save(&self, repo_name: &str, report_type: ReportType, content: &str) {
        let report = CachedReport {
            repo_name: repo_name.to_string(),
            report_type,
            content: content.to_string(),
            stored_at: Utc::now(),
        };
        let result = serde_json::to_string(&report)
            .map_err(anyhow::Error::from)
            .and_then(|data| {
                self.store
                    .set(&Self::key(repo_name, report_type), data, Some(self.ttl))
            });
        if let Err(e) = result {
            tracing::error!(
                "Failed to cache {} report for {repo_name}: {e:#}",
                report_type.as_str()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn cache(ttl: Duration) -> ReportCache {
        ReportCache::new(Arc::new(MemoryStore::new()), ttl)
    }

    #[test]
    fn test_key_sanitizes_repo_name() {
        assert_eq!(
            ReportCache::key("my repo/v2", ReportType::SecurityAudit),
            "report:my_repo_v2_security-audit"
        );
    }

    #[test]
    fn test_save_then_get_twice() {
        let cache = cache(DEFAULT_REPORT_TTL);
        cache.save("demo", ReportType::TestPlan, "plan body");
        assert_eq!(cache.get("demo", ReportType::TestPlan).as_deref(), Some("plan body"));
        assert_eq!(cache.get("demo", ReportType::TestPlan).as_deref(), Some("plan body"));
    }

    #[test]
    fn test_types_are_separate_entries() {
        let cache = cache(DEFAULT_REPORT_TTL);
        cache.save("demo", ReportType::TestPlan, "plan");
        assert!(cache.get("demo", ReportType::CodeHealth).is_none());
    }

    #[test]
    fn test_save_overwrites() {
        let cache = cache(DEFAULT_REPORT_TTL);
        cache.save("demo", ReportType::CodeHealth, "old");
        cache.save("demo", ReportType::CodeHealth, "new");
        assert_eq!(cache.get("demo", ReportType::CodeHealth).as_deref(), Some("new"));
    }

    #[test]
    fn test_expired_entry_is_a_miss() {
        let cache = cache(Duration::ZERO);
        cache.save("demo", ReportType::TestPlan, "plan");
        assert!(cache.get("demo", ReportType::TestPlan).is_none());
    }

    #[test]
    fn test_report_type_serializes_kebab_case() {
        let json = serde_json::to_value(ReportType::SecurityAudit).unwrap();
        assert_eq!(json, "security-audit");
    }
}
