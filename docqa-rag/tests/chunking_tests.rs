//! Property tests for the chunking laws shared by both chunkers.

use docqa_rag::{Chunker, FixedSizeChunker, RecursiveChunker, reconstruct};
use proptest::prelude::*;

/// A chunk size and an overlap strictly below it.
fn arb_size_and_overlap() -> impl Strategy<Value = (usize, usize)> {
    (1usize..60).prop_flat_map(|size| (Just(size), 0..size))
}

/// Text rich in the boundaries the recursive chunker looks for, plus arbitrary Unicode.
fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof!["[a-z .!?\n]{0,400}", "\\PC{0,200}"]
}

fn check_laws(chunks: &[String], text: &str, size: usize, overlap: usize) -> Result<(), TestCaseError> {
    let len = text.chars().count();

    if text.is_empty() {
        prop_assert!(chunks.is_empty());
        return Ok(());
    }
    if len <= size {
        prop_assert_eq!(chunks, &[text.to_string()][..]);
    }

    for chunk in chunks {
        prop_assert!(chunk.chars().count() <= size, "chunk longer than {}: {:?}", size, chunk);
    }

    for pair in chunks.windows(2) {
        let head: Vec<char> = pair[0].chars().collect();
        prop_assert!(head.len() > overlap);
        let tail: String = head[head.len() - overlap..].iter().collect();
        let next_start: String = pair[1].chars().take(overlap).collect();
        prop_assert_eq!(tail, next_start);
    }

    prop_assert_eq!(reconstruct(chunks, overlap), text);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn fixed_size_chunker_laws(text in arb_text(), (size, overlap) in arb_size_and_overlap()) {
        let chunks = FixedSizeChunker::new(size, overlap).split(&text);
        check_laws(&chunks, &text, size, overlap)?;

        // Every chunk but the last is exactly `size` characters.
        if let Some((_, full)) = chunks.split_last() {
            for chunk in full {
                prop_assert_eq!(chunk.chars().count(), size);
            }
        }
    }

    #[test]
    fn recursive_chunker_laws(text in arb_text(), (size, overlap) in arb_size_and_overlap()) {
        let chunks = RecursiveChunker::new(size, overlap).split(&text);
        check_laws(&chunks, &text, size, overlap)?;
    }
}

#[test]
fn recursive_chunker_cuts_at_sentences_in_prose() {
    let text = "The cat sat on the mat. The dog lay by the door. Birds sang outside.";
    let chunks = RecursiveChunker::new(30, 5).split(text);
    assert_eq!(chunks[0], "The cat sat on the mat. ");
    assert_eq!(reconstruct(&chunks, 5), text);
}

#[test]
fn restartable_and_deterministic() {
    let text = "one two three four five six seven eight nine ten";
    let chunker = RecursiveChunker::new(12, 3);
    assert_eq!(chunker.split(text), chunker.split(text));
}
