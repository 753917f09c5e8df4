// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`chunker`] turns a live byte stream into offset-addressed [`LogChunk`]s.
//! - [`runner`] owns one subprocess: it writes the script out, applies the
//!   environment and working directory, streams the combined stdout/stderr
//!   through the chunker and waits for the process to exit.

pub mod chunker;
pub mod runner;

pub use chunker::{Chunker, ChunkerSettings};
pub use runner::CommandRunner;

/// A contiguous slice of a job's output for one source.
///
/// `offset` counts bytes from the start of the source's stream for the whole
/// job, so consecutive chunks satisfy `a.offset + a.len() == b.offset` even
/// when they come from different commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogChunk {
    pub source: String,
    pub offset: u64,
    pub payload: Vec<u8>,
}

impl LogChunk {
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Offset of the first byte after this chunk.
    pub fn end_offset(&self) -> u64 {
        self.offset + self.payload.len() as u64
    }
}

/// How a process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitState {
    /// Exit code, absent when the process was terminated by a signal.
    pub code: Option<i32>,
    /// Killed by the agent after the command deadline elapsed.
    pub timed_out: bool,
}

impl ExitState {
    pub fn success(&self) -> bool {
        !self.timed_out && self.code == Some(0)
    }
}
