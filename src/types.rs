// src/types.rs

use std::fmt;

/// Lifecycle state of a job or a command as reported to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Queued,
    InProgress,
    Finished,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Queued => "queued",
            Status::InProgress => "in_progress",
            Status::Finished => "finished",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobResult {
    Passed,
    Failed,
}

impl JobResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobResult::Passed => "passed",
            JobResult::Failed => "failed",
        }
    }
}

impl fmt::Display for JobResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Return codes reported for finished commands.
pub mod return_code {
    pub const SUCCESS: i32 = 0;
    /// The command ran and exited unsuccessfully (or hit its deadline).
    pub const COMMAND_FAILED: i32 = 1;
    /// The agent could not construct or start the command.
    pub const INFRA_FAILURE: i32 = 255;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names() {
        assert_eq!(Status::Queued.to_string(), "queued");
        assert_eq!(Status::InProgress.as_str(), "in_progress");
        assert_eq!(Status::Finished.as_str(), "finished");
        assert_eq!(JobResult::Passed.as_str(), "passed");
        assert_eq!(JobResult::Failed.to_string(), "failed");
    }
}
