// src/exec/chunker.rs

//! Line-preserving output chunker.
//!
//! The stream is read one line at a time into a pending buffer. Once the
//! buffer holds at least `threshold` bytes it is emitted as a single chunk.
//! A line is never split, so a long line produces one oversized chunk.
//! Whatever is left at end of input is emitted as a final chunk.

use std::io::{self, BufRead};

use super::LogChunk;

/// Where a chunker starts and how eagerly it emits.
#[derive(Debug, Clone)]
pub struct ChunkerSettings {
    pub source: String,
    /// Minimum buffered bytes before a chunk is emitted. `0` behaves like `1`.
    pub threshold: usize,
    /// Offset of the first byte this chunker will read, within the job.
    pub start_offset: u64,
}

/// Iterator of [`LogChunk`]s over a buffered reader.
///
/// Finite and not restartable: it ends at end of input, or after yielding a
/// read error. Bytes read before an error are still emitted first.
pub struct Chunker<R> {
    reader: R,
    source: String,
    threshold: usize,
    offset: u64,
    pending: Vec<u8>,
    error: Option<io::Error>,
    done: bool,
}

impl<R: BufRead> Chunker<R> {
    pub fn new(reader: R, settings: &ChunkerSettings) -> Self {
        Self {
            reader,
            source: settings.source.clone(),
            threshold: settings.threshold.max(1),
            offset: settings.start_offset,
            pending: Vec::new(),
            error: None,
            done: false,
        }
    }

    /// Offset the next emitted chunk would start at.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn flush(&mut self) -> Option<LogChunk> {
        if self.pending.is_empty() {
            return None;
        }
        let payload = std::mem::take(&mut self.pending);
        let chunk = LogChunk {
            source: self.source.clone(),
            offset: self.offset,
            payload,
        };
        self.offset = chunk.end_offset();
        Some(chunk)
    }
}

impl<R: BufRead> Iterator for Chunker<R> {
    type Item = io::Result<LogChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.error.take() {
            return Some(Err(err));
        }
        if self.done {
            return None;
        }

        loop {
            match self.reader.read_until(b'\n', &mut self.pending) {
                Ok(0) => {
                    self.done = true;
                    return self.flush().map(Ok);
                }
                Ok(_) => {
                    if self.pending.len() >= self.threshold {
                        return self.flush().map(Ok);
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.done = true;
                    if self.pending.is_empty() {
                        return Some(Err(err));
                    }
                    self.error = Some(err);
                    return self.flush().map(Ok);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    fn settings(threshold: usize, start_offset: u64) -> ChunkerSettings {
        ChunkerSettings {
            source: "test".to_string(),
            threshold,
            start_offset,
        }
    }

    fn chunks(input: &[u8], threshold: usize, start: u64) -> Vec<LogChunk> {
        Chunker::new(Cursor::new(input.to_vec()), &settings(threshold, start))
            .collect::<io::Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn each_line_reaching_threshold_is_its_own_chunk() {
        let out = chunks(b"aaa\naaa\naaa\n", 3, 0);
        assert_eq!(out.len(), 3);
        assert_eq!(out[1].offset, 4);
        assert_eq!(out[2].payload, b"aaa\n");
    }

    #[test]
    fn short_lines_accumulate_until_threshold() {
        let out = chunks(b"a\nb\nc\nd\ne", 4, 0);
        let payloads: Vec<_> = out.iter().map(|c| c.payload.clone()).collect();
        assert_eq!(payloads, vec![b"a\nb\n".to_vec(), b"c\nd\n".to_vec(), b"e".to_vec()]);
    }

    #[test]
    fn long_line_is_never_split() {
        let line = [b'x'; 50];
        let mut input = line.to_vec();
        input.push(b'\n');
        let out = chunks(&input, 8, 0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 51);
    }

    #[test]
    fn offsets_continue_from_start_offset() {
        let out = chunks(b"test\n", 4096, 11);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].offset, 11);
        assert_eq!(out[0].source, "test");
    }

    #[test]
    fn zero_threshold_emits_per_line() {
        let out = chunks(b"a\nb\n", 0, 0);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn empty_input_emits_nothing() {
        assert!(chunks(b"", 3, 0).is_empty());
    }

    struct FailingAfter {
        data: Cursor<Vec<u8>>,
    }

    impl io::Read for FailingAfter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.data.read(buf)?;
            if n == 0 {
                return Err(io::Error::other("pipe broke"));
            }
            Ok(n)
        }
    }

    #[test]
    fn bytes_before_a_read_error_are_still_emitted() {
        let reader = io::BufReader::new(FailingAfter {
            data: Cursor::new(b"partial".to_vec()),
        });
        let mut chunker = Chunker::new(reader, &settings(100, 0));

        let first = chunker.next().unwrap().unwrap();
        assert_eq!(first.payload, b"partial");
        assert!(chunker.next().unwrap().is_err());
        assert!(chunker.next().is_none());
    }
}
