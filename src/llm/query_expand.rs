use anyhow::Result;
use std::sync::Arc;

use super::Completer;

/// Upper bound on synonyms accepted from the model.
const MAX_EXPANDED_TERMS: usize = 8;

/// Expands search keywords with technical synonyms via the LLM.
///
/// Expansion is an enrichment, never a requirement: with no completer, no
/// input, or any failure along the way, the input keywords come back as-is.
#[derive(Clone)]
pub struct KeywordExpander {
    completer: Option<Arc<dyn Completer>>,
    model: String,
}

impl KeywordExpander {
    pub fn new(completer: Arc<dyn Completer>, model: impl Into<String>) -> Self {
        Self {
            completer: Some(completer),
            model: model.into(),
        }
    }

    /// An expander that always returns its input.
    pub fn disabled() -> Self {
        Self {
            completer: None,
            model: String::new(),
        }
    }

    /// Returns the original keywords followed by any new synonyms, deduplicated.
    pub async fn expand(&self, keywords: &[String]) -> Vec<String> {
        if keywords.is_empty() {
            return Vec::new();
        }
        let Some(completer) = &self.completer else {
            return keywords.to_vec();
        };

        let prompt = build_expansion_prompt(keywords);
        let response = match completer.complete(&prompt, &self.model).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Keyword expansion failed, using raw keywords: {e}");
                return keywords.to_vec();
            }
        };

        match parse_expanded_terms(&response) {
            Ok(terms) => {
                let merged = merge_terms(keywords, terms);
                tracing::info!("Keywords expanded: {:?} -> {:?}", keywords, merged);
                merged
            }
            Err(e) => {
                tracing::warn!("Unparseable keyword expansion ({e}), using raw keywords");
                keywords.to_vec()
            }
        }
    }
}

fn build_expansion_prompt(keywords: &[String]) -> String {
    format!(
        "You are helping search a source-code repository. For the keywords below, list \
         up to {MAX_EXPANDED_TERMS} closely related technical terms, synonyms, or likely \
         identifier fragments (for example \"login\" -> \"auth\", \"signin\", \"session\").\n\n\
         Keywords: {}\n\n\
         Respond with ONLY a JSON array of lowercase strings. No explanation.",
        keywords.join(", ")
    )
}

/// Strip markdown code fences and parse the JSON string array inside.
fn parse_expanded_terms(content: &str) -> Result<Vec<String>> {
    let unfenced = content
        .replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "");

    let json_str = match (unfenced.find('['), unfenced.rfind(']')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => unfenced.trim(),
    };

    let terms: Vec<String> = serde_json::from_str(json_str)?;
    Ok(terms
        .into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .take(MAX_EXPANDED_TERMS)
        .collect())
}

fn merge_terms(original: &[String], expanded: Vec<String>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(original.len() + expanded.len());
    for term in original.iter().cloned().chain(expanded) {
        if !merged.iter().any(|t| t.eq_ignore_ascii_case(&term)) {
            merged.push(term);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::CompletionError;
    use async_trait::async_trait;

    struct FixedCompleter(Result<String, ()>);

    #[async_trait]
    impl Completer for FixedCompleter {
        async fn complete(&self, _prompt: &str, _model: &str) -> Result<String, CompletionError> {
            self.0
                .clone()
                .map_err(|_| CompletionError::Request("connection refused".into()))
        }
    }

    fn expander(reply: Result<&str, ()>) -> KeywordExpander {
        KeywordExpander::new(
            Arc::new(FixedCompleter(reply.map(String::from))),
            "test-model",
        )
    }

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_clean_json_array() {
        let result = parse_expanded_terms(r#"["auth", "signin"]"#).unwrap();
        assert_eq!(result, vec!["auth", "signin"]);
    }

    #[test]
    fn test_parse_json_embedded_in_text() {
        let input = "Here you go:\n[\"error handling\", \"Exception\"]\nHope that helps!";
        let result = parse_expanded_terms(input).unwrap();
        assert_eq!(result, vec!["error handling", "exception"]);
    }

    #[test]
    fn test_parse_json_in_markdown_code_block() {
        let input = "```json\n[\"database\", \"sql\"]\n```";
        assert_eq!(parse_expanded_terms(input).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_truncates() {
        let input = r#"["a","b","c","d","e","f","g","h","i","j"]"#;
        assert_eq!(parse_expanded_terms(input).unwrap().len(), MAX_EXPANDED_TERMS);
    }

    #[test]
    fn test_parse_garbage_is_error() {
        assert!(parse_expanded_terms("I don't understand the question.").is_err());
        assert!(parse_expanded_terms("[\"partial").is_err());
    }

    #[test]
    fn test_merge_dedupes_and_keeps_originals_first() {
        let merged = merge_terms(&words(&["login"]), words(&["auth", "Login", "session"]));
        assert_eq!(merged, vec!["login", "auth", "session"]);
    }

    #[tokio::test]
    async fn test_expand_empty_input() {
        assert!(expander(Ok("[\"x\"]")).expand(&[]).await.is_empty());
    }

    #[tokio::test]
    async fn test_expand_completer_error_returns_input() {
        let out = expander(Err(())).expand(&words(&["login"])).await;
        assert_eq!(out, vec!["login"]);
    }

    #[tokio::test]
    async fn test_expand_unparseable_reply_returns_input() {
        let out = expander(Ok("no idea")).expand(&words(&["login"])).await;
        assert_eq!(out, vec!["login"]);
    }

    #[tokio::test]
    async fn test_expand_success_unions_terms() {
        let out = expander(Ok("```json\n[\"auth\", \"signin\"]\n```"))
            .expand(&words(&["login"]))
            .await;
        assert_eq!(out, vec!["login", "auth", "signin"]);
    }

    #[tokio::test]
    async fn test_disabled_expander_is_noop() {
        let out = KeywordExpander::disabled().expand(&words(&["a", "b"])).await;
        assert_eq!(out, vec!["a", "b"]);
    }
}
