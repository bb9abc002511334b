//! Plain-text normalization of completion output.
//!
//! The UI renders answers as plain text plus at most one kind of rich block:
//! mermaid diagrams. Diagram fences are lifted out behind placeholders,
//! markdown decoration is stripped from the remaining text, and the
//! diagrams are put back in a normalized ```` ```mermaid ```` fence.

use regex::Regex;
use std::sync::LazyLock;

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(.*?)```").expect("valid regex"));

static DIAGRAM_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:graph|flowchart|sequenceDiagram|classDiagram|stateDiagram(?:-v2)?|erDiagram|journey|gantt|pie)\b",
    )
    .expect("valid regex")
});

static FENCE_INFO_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_+-]*[ \t]*\n").expect("valid regex"));

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]{0,3}#{1,6}[ \t]*").expect("valid regex"));

static STAR_BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([ \t]*)\*[ \t]+").expect("valid regex"));

static EXTRA_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").expect("valid regex"));

static MERMAID_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```mermaid\n(.*?)\n```").expect("valid regex"));

fn placeholder(index: usize) -> String {
    format!("@@DIAGRAM_{index}@@")
}

pub fn sanitize(raw: &str) -> String {
    let mut diagrams: Vec<String> = Vec::new();

    // 1. Protect diagram fences; unwrap every other fence to its content
    let protected = FENCED_BLOCK.replace_all(raw, |caps: &regex::Captures| {
        let body = &caps[1];
        match DIAGRAM_KEYWORD.find(body) {
            Some(m) => {
                let diagram = body[m.start()..].trim_end();
                diagrams.push(format!("```mermaid\n{diagram}\n```"));
                placeholder(diagrams.len() - 1)
            }
            None => FENCE_INFO_LINE.replace(body, "").into_owned(),
        }
    });

    // 2. Strip markdown decoration from the unprotected text
    let text = HEADING.replace_all(&protected, "");
    let text = STAR_BULLET.replace_all(&text, "${1}- ");
    let text: String = text
        .chars()
        .filter(|c| !matches!(c, '*' | '`' | '~'))
        .collect();
    let text = EXTRA_BLANK_LINES.replace_all(&text, "\n\n");
    let mut text = text.trim().to_string();

    // 3. Restore diagrams
    for (i, diagram) in diagrams.iter().enumerate() {
        text = text.replace(&placeholder(i), diagram);
    }
    text
}

/// Inner source of the first normalized mermaid block, if any.
pub fn extract_mermaid(sanitized: &str) -> Option<String> {
    MERMAID_BLOCK
        .captures(sanitized)
        .map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagram_preserved_and_bold_stripped() {
        let raw = "The **login** flow:\n```mermaid\ngraph TD; A-->B\n```\nDone.";
        let out = sanitize(raw);
        assert!(out.contains("```mermaid\ngraph TD; A-->B\n```"));
        assert!(out.contains("The login flow:"));
        assert!(!out.contains("**"));
    }

    #[test]
    fn test_diagram_with_untagged_fence_is_normalized() {
        let raw = "```\n%% comment\nsequenceDiagram\n  A->>B: hi\n```";
        assert_eq!(sanitize(raw), "```mermaid\nsequenceDiagram\n  A->>B: hi\n```");
    }

    #[test]
    fn test_paragraph_is_not_a_diagram_keyword() {
        let raw = "```text\nthis paragraph mentions nothing special\n```";
        let out = sanitize(raw);
        assert!(!out.contains("mermaid"));
        assert_eq!(out, "this paragraph mentions nothing special");
    }

    #[test]
    fn test_code_fence_unwrapped_and_backticks_removed() {
        let raw = "Call `login()` here:\n```js\nlogin(user);\n```";
        let out = sanitize(raw);
        assert_eq!(out, "Call login() here:\nlogin(user);");
    }

    #[test]
    fn test_headings_bullets_and_tildes_stripped() {
        let raw = "## Summary\n* first\n* second\n~~old~~ new";
        let out = sanitize(raw);
        assert_eq!(out, "Summary\n- first\n- second\nold new");
    }

    #[test]
    fn test_diagram_hash_and_star_characters_survive() {
        let raw = "# Title\n```mermaid\nflowchart LR\n  A[\"#1 *star*\"] --> B\n```";
        let out = sanitize(raw);
        assert!(out.starts_with("Title\n"));
        assert!(out.contains("A[\"#1 *star*\"] --> B"));
    }

    #[test]
    fn test_multiple_diagrams_restored_in_order() {
        let raw = "```mermaid\npie\n  \"a\": 1\n```\nand\n```mermaid\ngantt\n  title T\n```";
        let out = sanitize(raw);
        let pie = out.find("pie").unwrap();
        let gantt = out.find("gantt").unwrap();
        assert!(pie < gantt);
        assert!(!out.contains("@@DIAGRAM_"));
    }

    #[test]
    fn test_collapses_blank_lines() {
        assert_eq!(sanitize("a\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_extract_mermaid() {
        let out = sanitize("x\n```mermaid\ngraph TD\n  A-->B\n```");
        assert_eq!(extract_mermaid(&out).as_deref(), Some("graph TD\n  A-->B"));
        assert!(extract_mermaid("no diagram").is_none());
    }
}
