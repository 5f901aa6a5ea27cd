//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`FixedSizeChunker`] — hard cuts every `chunk_size - chunk_overlap` characters
//! - [`RecursiveChunker`] — ends each chunk at the best natural boundary
//!   (paragraph, line, sentence, word) that fits, falling back to a hard cut
//!
//! Sizes are counted in characters, not bytes. Both strategies start chunk
//! `i + 1` exactly `chunk_overlap` characters before the end of chunk `i`, so
//! dropping the last `chunk_overlap` characters of every chunk but the final
//! one and concatenating the rest gives back the source text (see [`reconstruct`]).

use std::collections::HashMap;

use crate::document::{Chunk, Document};

/// A strategy for splitting documents into chunks.
///
/// Implementations only decide where the cuts go; [`chunk`](Chunker::chunk)
/// turns the pieces into [`Chunk`]s carrying the document's identity.
pub trait Chunker: Send + Sync {
    /// Split raw text into ordered pieces.
    ///
    /// Returns an empty `Vec` for empty text and a single piece when the text
    /// fits in one chunk.
    fn split(&self, text: &str) -> Vec<String>;

    /// Split a document's concatenated page text into chunks.
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        self.split(&document.text())
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let mut metadata = HashMap::new();
                metadata.insert("source".to_string(), document.id.clone());
                metadata.insert("chunk_index".to_string(), index.to_string());
                if let Some(uri) = &document.source_uri {
                    metadata.insert("source_uri".to_string(), uri.clone());
                }
                Chunk {
                    id: format!("{}_{index}", document.id),
                    document_id: document.id.clone(),
                    index,
                    text,
                    metadata,
                }
            })
            .collect()
    }
}

/// Clamp parameters so that `0 <= overlap < size`.
fn normalize(chunk_size: usize, chunk_overlap: usize) -> (usize, usize) {
    let size = chunk_size.max(1);
    (size, chunk_overlap.min(size - 1))
}

/// Walk the text producing windows of at most `size` characters, letting
/// `cut` pick the end of each window that does not reach the end of the text.
///
/// `cut(chars, start, hard_end)` must return an end in `(start + overlap, hard_end]`.
fn split_with<F>(text: &str, size: usize, overlap: usize, cut: F) -> Vec<String>
where
    F: Fn(&[char], usize, usize) -> usize,
{
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut pieces = Vec::new();
    let mut start = 0;

    while start < len {
        let hard_end = (start + size).min(len);
        let end = if hard_end == len { len } else { cut(&chars, start, hard_end) };
        pieces.push(chars[start..end].iter().collect());
        if end == len {
            break;
        }
        start = end - overlap;
    }

    pieces
}

/// Splits text into fixed-size chunks by character count with configurable overlap.
///
/// Chunk `i` starts at character `i * (chunk_size - chunk_overlap)`, and every
/// chunk except possibly the last is exactly `chunk_size` characters long.
///
/// # Example
///
/// ```rust
/// use docqa_rag::{Chunker, FixedSizeChunker};
///
/// let chunker = FixedSizeChunker::new(5, 0);
/// assert_eq!(chunker.split("AAAAABBBBBCCCCC"), vec!["AAAAA", "BBBBB", "CCCCC"]);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// A zero `chunk_size` is treated as 1 and `chunk_overlap` is capped at
    /// `chunk_size - 1`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let (chunk_size, chunk_overlap) = normalize(chunk_size, chunk_overlap);
        Self { chunk_size, chunk_overlap }
    }
}

impl Chunker for FixedSizeChunker {
    fn split(&self, text: &str) -> Vec<String> {
        split_with(text, self.chunk_size, self.chunk_overlap, |_, _, hard_end| hard_end)
    }
}

/// Boundary kinds, highest priority first.
#[derive(Debug, Clone, Copy)]
enum Boundary {
    Paragraph,
    Line,
    Sentence,
    Word,
}

impl Boundary {
    const ALL: [Boundary; 4] = [Self::Paragraph, Self::Line, Self::Sentence, Self::Word];

    /// Whether a cut right before `chars[end]` lands just after this boundary.
    fn ends_at(self, chars: &[char], end: usize) -> bool {
        let last = chars[end - 1];
        match self {
            Self::Paragraph => end >= 2 && last == '\n' && chars[end - 2] == '\n',
            Self::Line => last == '\n',
            Self::Sentence => {
                end >= 2 && last.is_whitespace() && matches!(chars[end - 2], '.' | '!' | '?')
            }
            Self::Word => last.is_whitespace(),
        }
    }
}

/// Splits text preferring natural boundaries: paragraphs, then lines, then
/// sentences, then words.
///
/// Each chunk ends right after the latest boundary of the highest-priority
/// kind found in the second half of its window. When no boundary is found
/// the chunk is cut at exactly `chunk_size` characters.
///
/// # Example
///
/// ```rust
/// use docqa_rag::{Chunker, RecursiveChunker};
///
/// let chunker = RecursiveChunker::new(12, 0);
/// assert_eq!(chunker.split("alpha beta gamma"), vec!["alpha beta ", "gamma"]);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// A zero `chunk_size` is treated as 1 and `chunk_overlap` is capped at
    /// `chunk_size - 1`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let (chunk_size, chunk_overlap) = normalize(chunk_size, chunk_overlap);
        Self { chunk_size, chunk_overlap }
    }

    fn cut(&self, chars: &[char], start: usize, hard_end: usize) -> usize {
        // Keep chunks at least half full, and always past the overlap so the
        // next chunk starts strictly later.
        let min_end = start + (self.chunk_overlap + 1).max(self.chunk_size / 2);
        if min_end > hard_end {
            return hard_end;
        }
        for boundary in Boundary::ALL {
            if let Some(end) = (min_end..=hard_end).rev().find(|&e| boundary.ends_at(chars, e)) {
                return end;
            }
        }
        hard_end
    }
}

impl Chunker for RecursiveChunker {
    fn split(&self, text: &str) -> Vec<String> {
        split_with(text, self.chunk_size, self.chunk_overlap, |chars, start, hard_end| {
            self.cut(chars, start, hard_end)
        })
    }
}

/// Rebuild the source text from chunks produced with the given overlap.
///
/// Drops the trailing `overlap` characters of every chunk but the last.
pub fn reconstruct<S: AsRef<str>>(chunks: &[S], overlap: usize) -> String {
    let mut text = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        let chunk = chunk.as_ref();
        if i + 1 == chunks.len() {
            text.push_str(chunk);
        } else {
            let keep = chunk.chars().count().saturating_sub(overlap);
            text.extend(chunk.chars().take(keep));
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_size_splits_exactly() {
        let chunker = FixedSizeChunker::new(5, 0);
        assert_eq!(chunker.split("AAAAABBBBBCCCCC"), vec!["AAAAA", "BBBBB", "CCCCC"]);
    }

    #[test]
    fn fixed_size_overlap_offsets() {
        let chunker = FixedSizeChunker::new(4, 2);
        assert_eq!(chunker.split("abcdefgh"), vec!["abcd", "cdef", "efgh"]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(FixedSizeChunker::new(10, 2).split("").is_empty());
        assert!(RecursiveChunker::new(10, 2).split("").is_empty());
    }

    #[test]
    fn short_text_is_single_chunk() {
        assert_eq!(RecursiveChunker::new(100, 20).split("short text"), vec!["short text"]);
        assert_eq!(FixedSizeChunker::new(10, 3).split("exactly 10"), vec!["exactly 10"]);
    }

    #[test]
    fn recursive_prefers_paragraphs_over_words() {
        let text = "first para here\n\nsecond one follows";
        let chunks = RecursiveChunker::new(24, 0).split(text);
        assert_eq!(chunks[0], "first para here\n\n");
        assert_eq!(reconstruct(&chunks, 0), text);
    }

    #[test]
    fn recursive_prefers_sentences_over_words() {
        let text = "One two. Three four five six";
        let chunks = RecursiveChunker::new(16, 0).split(text);
        assert_eq!(chunks[0], "One two. ");
    }

    #[test]
    fn recursive_falls_back_to_hard_cut() {
        let chunks = RecursiveChunker::new(4, 1).split("abcdefghij");
        assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn multibyte_text_does_not_panic() {
        let text = "héllo wörld ünïcödé tëxt";
        let chunks = RecursiveChunker::new(7, 2).split(text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 7));
        assert_eq!(reconstruct(&chunks, 2), text);
    }

    #[test]
    fn overlap_is_clamped() {
        let chunks = FixedSizeChunker::new(3, 10).split("abcdef");
        assert_eq!(reconstruct(&chunks, 2), "abcdef");
    }

    #[test]
    fn chunks_carry_document_identity() {
        let doc = Document::new("manual.pdf", vec!["AAAAA".into(), "BBBB".into()])
            .with_source_uri("docs/manual.pdf");
        let chunks = FixedSizeChunker::new(5, 0).chunk(&doc);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].id, "manual.pdf_1");
        assert_eq!(chunks[1].index, 1);
        assert_eq!(chunks[1].text, "\nBBBB");
        assert_eq!(chunks[0].metadata.get("source").map(String::as_str), Some("manual.pdf"));
        assert_eq!(chunks[0].metadata.get("chunk_index").map(String::as_str), Some("0"));
        assert_eq!(
            chunks[0].metadata.get("source_uri").map(String::as_str),
            Some("docs/manual.pdf")
        );
    }
}
