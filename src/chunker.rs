//! Sentence-window chunking for article abstracts.
//!
//! Abstracts are split on simple sentence boundaries and grouped into
//! fixed-size windows. The function is pure: identical input always yields
//! identical chunk boundaries, which is what makes the derived chunk
//! identifiers stable across re-ingestion.

use std::sync::LazyLock;

use regex::Regex;

/// Number of sentences per chunk when the caller has no preference.
pub const DEFAULT_SENTENCES_PER_CHUNK: usize = 3;

/// Sentence terminator followed by whitespace. Deliberately naive: no
/// abbreviation handling, matching the boundary rule the corpus was
/// ingested with originally.
static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("sentence boundary regex must compile"));

/// Splits `text` into consecutive windows of `sentences_per_chunk` sentences,
/// joined with a single space. The final window holds the remainder
/// (1..=`sentences_per_chunk` sentences). Empty or whitespace-only input
/// yields no chunks. A zero window size is treated as 1.
pub fn chunk_sentences(text: &str, sentences_per_chunk: usize) -> Vec<String> {
    let window = sentences_per_chunk.max(1);
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return Vec::new();
    }

    sentences
        .chunks(window)
        .map(|group| group.join(" "))
        .collect()
}

/// Composite identifier for the `index`-th chunk of an article. The format is
/// load-bearing: re-ingesting the same article must reproduce the same ids.
pub fn chunk_id(article_id: &str, index: usize) -> String {
    format!("{article_id}_chunk_{index}")
}

/// Splits on `[.!?]` + whitespace, keeping the terminator with its sentence.
fn split_sentences(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut sentences = Vec::new();
    let mut start = 0;
    for boundary in SENTENCE_BOUNDARY.find_iter(text) {
        // The match covers the terminator and the following whitespace; the
        // sentence ends after the terminator character.
        let end = boundary.start() + 1;
        push_trimmed(&mut sentences, &text[start..end]);
        start = boundary.end();
    }
    push_trimmed(&mut sentences, &text[start..]);
    sentences
}

fn push_trimmed(sentences: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIX_SENTENCES: &str = "One is here. Two is here! Three is here? \
        Four is here. Five is here. Six is here.";

    #[test]
    fn groups_sentences_into_windows() {
        let chunks = chunk_sentences(SIX_SENTENCES, 3);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "One is here. Two is here! Three is here?");
        assert_eq!(chunks[1], "Four is here. Five is here. Six is here.");
    }

    #[test]
    fn final_window_holds_remainder() {
        let text = "A. B. C. D.";
        let chunks = chunk_sentences(text, 3);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "A. B. C.");
        assert_eq!(chunks[1], "D.");
    }

    #[test]
    fn chunk_count_is_ceil_of_sentences_over_window() {
        for (sentences, window, expected) in [(6, 3, 2), (7, 3, 3), (1, 3, 1), (5, 2, 3)] {
            let text = (0..sentences)
                .map(|i| format!("Sentence number {i} goes here."))
                .collect::<Vec<_>>()
                .join(" ");
            assert_eq!(
                chunk_sentences(&text, window).len(),
                expected,
                "{sentences} sentences / window {window}"
            );
        }
    }

    #[test]
    fn empty_and_whitespace_input_yield_nothing() {
        assert!(chunk_sentences("", 3).is_empty());
        assert!(chunk_sentences("   \n\t  ", 3).is_empty());
    }

    #[test]
    fn single_sentence_without_trailing_boundary() {
        let chunks = chunk_sentences("No terminator at all", 3);
        assert_eq!(chunks, vec!["No terminator at all".to_string()]);
    }

    #[test]
    fn chunking_is_deterministic() {
        let first = chunk_sentences(SIX_SENTENCES, 2);
        let second = chunk_sentences(SIX_SENTENCES, 2);
        assert_eq!(first, second);
    }

    #[test]
    fn zero_window_is_clamped_to_one() {
        let chunks = chunk_sentences("A. B.", 0);
        assert_eq!(chunks, vec!["A.".to_string(), "B.".to_string()]);
    }

    #[test]
    fn chunk_ids_are_content_addressed() {
        let ids: Vec<String> = (0..4).map(|i| chunk_id("12345", i)).collect();
        assert_eq!(
            ids,
            vec![
                "12345_chunk_0",
                "12345_chunk_1",
                "12345_chunk_2",
                "12345_chunk_3"
            ]
        );
    }
}
