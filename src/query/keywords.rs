use std::collections::HashSet;

/// Words that carry no search signal: English filler plus the vocabulary of
/// repository-level questions ("last commit", "how many commits", "history"),
/// so a query built only from those yields no file keywords.
pub const STOPWORDS: &[&str] = &[
    "a", "about", "after", "all", "am", "an", "and", "any", "are", "as", "at", "be", "been",
    "before", "by", "can", "could", "did", "do", "does", "for", "from", "get", "give", "had",
    "has", "have", "i", "in", "into", "is", "it", "its", "me", "my", "of", "on", "or", "our",
    "please", "show", "tell", "that", "the", "their", "them", "then", "there", "these", "this",
    "those", "to", "us", "was", "we", "were", "what", "where", "which", "who", "why", "will",
    "with", "would", "you", "your",
    // repository-level vocabulary
    "add", "added", "change", "changed", "changes", "code", "commit", "commits", "containing",
    "created", "file", "files", "first", "history", "how", "introduced", "last", "latest", "log",
    "made", "many", "mentioning", "message", "messages", "modified", "recent", "removed", "repo",
    "repository", "timeline", "updated", "when",
];

/// Lowercased search keywords from `query`: tokens of letters, digits,
/// `_` and `-`, minus stopwords and tokens shorter than three characters,
/// deduplicated in order of first appearance.
pub fn extract_keywords(query: &str, stopwords: &[&str]) -> Vec<String> {
    let stop: HashSet<&str> = stopwords.iter().copied().collect();
    let mut seen = HashSet::new();

    query
        .to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
        .map(|t| t.trim_matches('-'))
        .filter(|t| t.chars().count() >= 3 && !stop.contains(t))
        .filter(|t| seen.insert(t.to_string()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_stopwords_and_short_tokens() {
        let kw = extract_keywords("When was the login page changed?", STOPWORDS);
        assert_eq!(kw, vec!["login", "page"]);
    }

    #[test]
    fn test_repo_level_query_has_no_keywords() {
        assert!(extract_keywords("show me the last commit", STOPWORDS).is_empty());
        assert!(extract_keywords("how many commits?", STOPWORDS).is_empty());
        assert!(extract_keywords("commit history", STOPWORDS).is_empty());
    }

    #[test]
    fn test_dedupes_and_keeps_identifiers() {
        let kw = extract_keywords("Why is user_auth failing? user_auth again", STOPWORDS);
        assert_eq!(kw, vec!["user_auth", "failing", "again"]);
    }

    #[test]
    fn test_custom_stopwords() {
        let kw = extract_keywords("payment gateway timeout", &["gateway"]);
        assert_eq!(kw, vec!["payment", "timeout"]);
    }
}
