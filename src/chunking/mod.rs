//! Fixed-size chunking of source files for the vector index.

use uuid::Uuid;

use crate::models::CodeChunk;

/// Characters per chunk used at ingestion time.
pub const DEFAULT_CHUNK_CHARS: usize = 2_000;

/// Split `text` into consecutive windows of at most `size` characters.
///
/// Windows are strict: no overlap, no attempt to align on lines. Every chunk
/// gets a fresh UUID v4 id and carries `file_path` and `commit`.
pub fn chunk_text(text: &str, file_path: &str, commit: Option<&str>, size: usize) -> Vec<CodeChunk> {
    if text.is_empty() || size == 0 {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut count = 0usize;

    for (idx, _) in text.char_indices() {
        if count == size {
            chunks.push(make_chunk(&text[start..idx], file_path, commit));
            start = idx;
            count = 0;
        }
        count += 1;
    }
    chunks.push(make_chunk(&text[start..], file_path, commit));

    chunks
}

fn make_chunk(text: &str, file_path: &str, commit: Option<&str>) -> CodeChunk {
    CodeChunk {
        id: Uuid::new_v4().to_string(),
        text: text.to_string(),
        file_path: file_path.to_string(),
        commit: commit.map(str::to_string),
        embedding: None,
        score: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert!(chunk_text("", "a.ts", None, 10).is_empty());
    }

    #[test]
    fn test_windows_cover_text_exactly() {
        let text = "abcdefghijklmnopqrstuvwxy";
        let chunks = chunk_text(text, "a.ts", Some("abc123"), 10);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "abcdefghij");
        assert_eq!(chunks[2].text, "uvwxy");
        let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(joined, text);
        assert!(chunks.iter().all(|c| c.commit.as_deref() == Some("abc123")));
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_empty_chunk() {
        let chunks = chunk_text("abcdef", "a.ts", None, 3);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].text, "def");
    }

    #[test]
    fn test_multibyte_characters_counted_as_chars() {
        let text = "héllo wörld";
        let chunks = chunk_text(text, "a.ts", None, 4);
        assert_eq!(chunks[0].text, "héll");
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_ids_are_unique() {
        let chunks = chunk_text(&"x".repeat(DEFAULT_CHUNK_CHARS * 3), "a.ts", None, DEFAULT_CHUNK_CHARS);
        assert_eq!(chunks.len(), 3);
        assert_ne!(chunks[0].id, chunks[1].id);
        assert_eq!(chunks[0].file_path, "a.ts");
    }
}
