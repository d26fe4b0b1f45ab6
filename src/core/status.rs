//! Job status management.
//!
//! This module defines the states a job moves through during its lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle status of a job.
///
/// A job starts as `Queued`, becomes `Processing` once a worker owns it, and
/// from there either terminates as `Success`, waits out a backoff as
/// `Retrying`, or terminates as `Failed` once its retry budget is exhausted.
///
/// The status string and the job's physical location (main queue, delayed
/// holding area, dead-letter collection) always converge within one
/// transition: `Failed` jobs live in the dead-letter collection and nowhere
/// else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    /// Waiting in the main queue for a worker
    #[serde(rename = "QUEUED")]
    Queued,
    /// Currently owned and executed by a worker
    #[serde(rename = "PROCESSING")]
    Processing,
    /// Waiting in the delayed holding area for its backoff to elapse
    #[serde(rename = "RETRYING")]
    Retrying,
    /// Completed successfully; terminal
    #[serde(rename = "SUCCESS")]
    Success,
    /// Retry budget exhausted; resides in the dead-letter collection
    #[serde(rename = "FAILED")]
    Failed,
}

impl JobStatus {
    /// Returns the canonical uppercase name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "QUEUED",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Retrying => "RETRYING",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failed => "FAILED",
        }
    }

    /// Checks if the job is in a terminal state.
    ///
    /// `Failed` is terminal only until an operator retries it out of the
    /// dead-letter collection, which resets the job to `Queued`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
