use sha2::{Digest, Sha256};
use unicode_segmentation::UnicodeSegmentation;

/// Whitespace-delimited token count.
pub fn count_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Sentences by Unicode sentence boundaries, trimmed, empties dropped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    text.split_sentence_bounds()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Blank-line separated paragraphs, trimmed, empties dropped.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// The first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Stable hash of the first `prefix_chars` characters.
pub fn prefix_hash(text: &str, prefix_chars: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(truncate_chars(text, prefix_chars).as_bytes());
    hex::encode(&hasher.finalize()[..16])
}
