//! Intent classification
//!
//! Maps a query (with the `@Repo` token already removed) onto one of the
//! answer modes using ordered keyword rules. The first matching rule wins,
//! so the specialized report modes are checked before the broad
//! debug/timeline/flow vocabularies they overlap with.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Commit history of a file or of the whole repository
    Timeline,
    /// Explanation of code logic with a diagram
    Flow,
    /// File listing
    Command,
    /// Generated test plan
    Test,
    /// Generated security audit
    Security,
    /// Generated code-health report
    Health,
    /// Root-cause analysis of a failure
    Debug,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Timeline => write!(f, "timeline"),
            Mode::Flow => write!(f, "flow"),
            Mode::Command => write!(f, "command"),
            Mode::Test => write!(f, "test"),
            Mode::Security => write!(f, "security"),
            Mode::Health => write!(f, "health"),
            Mode::Debug => write!(f, "debug"),
        }
    }
}

const TEST_PHRASES: &[&str] = &[
    "test case",
    "test cases",
    "generate tests",
    "create tests",
    "test plan",
    "qa audit",
    "qa plan",
    "write tests",
];

const SECURITY_PHRASES: &[&str] = &[
    "security audit",
    "security scan",
    "vulnerability report",
    "analyze vulnerabilities",
    "check security",
    "security check",
];

const HEALTH_PHRASES: &[&str] = &[
    "code health",
    "health score",
    "quality score",
    "maintainability score",
    "code quality",
    "health report",
];

/// Matched as plain substrings: "bug" anywhere (even inside "debugging") routes to debug.
const DEBUG_PHRASES: &[&str] = &[
    "break",
    "broke",
    "broken",
    "failing",
    "fail",
    "not working",
    "stopped working",
    "regression",
    "bug",
    "issue started",
    "unexpected behavior",
    "why is x failing",
    "when did x fail",
];

const TIMELINE_PHRASES: &[&str] = &[
    "when",
    "commit",
    "added",
    "introduced",
    "changed",
    "changes",
    "timeline",
    "bug",
    "removed",
    "origin",
    "history",
    "log",
    "updated",
    "last commit",
    "commits",
];

const FLOW_PHRASES: &[&str] = &[
    "how",
    "flow",
    "explain",
    "logic",
    "architecture",
    "what happens",
    "walk me through",
];

static CLASSIFIER: LazyLock<IntentClassifier> = LazyLock::new(IntentClassifier::new);

static FILE_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d+)\s*files?\b").expect("valid regex"));

/// Rule-based classifier holding the compiled keyword patterns.
pub struct IntentClassifier {
    command: Regex,
    test: Vec<Regex>,
    security: Vec<Regex>,
    health: Vec<Regex>,
    timeline: Vec<Regex>,
    flow: Vec<Regex>,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self {
            // "list files", "list 5 files", "show me files", "give me a list of files"
            command: Regex::new(
                r"^(list|show|give|get|what)(\s+(me|us))?(\s+(a|the|any|some|top|recent))?(\s+list\s+of)?(\s+(all|repo))?\s*(\d+\s*)?files?",
            )
            .expect("valid regex"),
            test: Self::word_patterns(TEST_PHRASES),
            security: Self::word_patterns(SECURITY_PHRASES),
            health: Self::word_patterns(HEALTH_PHRASES),
            timeline: Self::word_patterns(TIMELINE_PHRASES),
            flow: Self::word_patterns(FLOW_PHRASES),
        }
    }

    fn word_patterns(phrases: &[&str]) -> Vec<Regex> {
        phrases
            .iter()
            .map(|p| Regex::new(&format!(r"\b{}\b", regex::escape(p))).expect("valid regex"))
            .collect()
    }

    fn any_word(patterns: &[Regex], text: &str) -> bool {
        patterns.iter().any(|re| re.is_match(text))
    }

    pub fn classify(&self, query: &str) -> Mode {
        let lower = query.trim().to_lowercase();

        if self.command.is_match(&lower) {
            return Mode::Command;
        }
        if Self::any_word(&self.test, &lower) {
            return Mode::Test;
        }
        if Self::any_word(&self.security, &lower) {
            return Mode::Security;
        }
        if Self::any_word(&self.health, &lower) {
            return Mode::Health;
        }
        if DEBUG_PHRASES.iter().any(|p| lower.contains(p)) {
            return Mode::Debug;
        }
        if Self::any_word(&self.timeline, &lower) {
            return Mode::Timeline;
        }
        if Self::any_word(&self.flow, &lower) {
            return Mode::Flow;
        }
        Mode::Flow
    }
}

/// Classify with the shared default classifier.
pub fn classify(query: &str) -> Mode {
    CLASSIFIER.classify(query)
}

/// The `N` of an "N files" request, if the query names one.
pub fn command_file_limit(query: &str) -> Option<usize> {
    FILE_COUNT
        .captures(query)
        .and_then(|caps| caps[1].parse().ok())
}
