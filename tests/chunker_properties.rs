// tests/chunker_properties.rs

use std::io::Cursor;

use jobstep_agent::exec::{Chunker, ChunkerSettings, LogChunk};
use proptest::prelude::*;

fn chunk_all(input: &[u8], threshold: usize, start_offset: u64) -> Vec<LogChunk> {
    let settings = ChunkerSettings {
        source: "console".to_string(),
        threshold,
        start_offset,
    };
    Chunker::new(Cursor::new(input.to_vec()), &settings)
        .collect::<Result<Vec<_>, _>>()
        .expect("reading from memory cannot fail")
}

/// Output made of short lines, with or without a trailing newline.
fn log_output() -> impl Strategy<Value = Vec<u8>> {
    (
        prop::collection::vec(prop::collection::vec(b'a'..=b'z', 0..40), 0..30),
        any::<bool>(),
    )
        .prop_map(|(lines, trailing_newline)| {
            let mut out = lines.join(&b'\n');
            if trailing_newline && !out.is_empty() {
                out.push(b'\n');
            }
            out
        })
}

proptest! {
    #[test]
    fn chunks_reassemble_the_input(input in log_output(), threshold in 0usize..64) {
        let chunks = chunk_all(&input, threshold, 0);
        let joined: Vec<u8> = chunks.iter().flat_map(|c| c.payload.clone()).collect();
        prop_assert_eq!(joined, input);
    }

    #[test]
    fn offsets_are_contiguous_from_the_start_offset(
        input in log_output(),
        threshold in 1usize..64,
        start in 0u64..10_000,
    ) {
        let chunks = chunk_all(&input, threshold, start);
        let mut expected = start;
        for chunk in &chunks {
            prop_assert_eq!(chunk.offset, expected);
            prop_assert!(!chunk.is_empty());
            expected = chunk.end_offset();
        }
        prop_assert_eq!(expected, start + input.len() as u64);
    }

    #[test]
    fn only_the_last_chunk_may_end_mid_line(input in log_output(), threshold in 1usize..64) {
        let chunks = chunk_all(&input, threshold, 0);
        if let Some((_, init)) = chunks.split_last() {
            for chunk in init {
                prop_assert_eq!(chunk.payload.last(), Some(&b'\n'));
                prop_assert!(chunk.len() >= threshold);
            }
        }
    }
}
