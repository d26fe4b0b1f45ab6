//! Job definition and management.
//!
//! This module contains the core [`Job`] struct that represents a unit of
//! background work together with the minimal lifecycle metadata the engine
//! tracks for it.
//!
//! ## Job Lifecycle
//!
//! ```text
//! QUEUED → PROCESSING → SUCCESS
//!              ↓
//!          RETRYING → QUEUED (after backoff)
//!              ↓
//!           FAILED (dead-letter collection)
//! ```
//!
//! A job is created by the producer at `QUEUED` with a retry count of zero,
//! mutated by whichever worker currently owns it, and persists indefinitely
//! for history and inspection. The only way a record is destroyed is an
//! explicit dead-letter delete.
//!
//! ## Examples
//!
//! ```rust
//! use backburner::Job;
//!
//! let job = Job::new(1, "send_report");
//! assert_eq!(job.retries, 0);
//! assert_eq!(job.max_retries, 3);
//!
//! // Jobs are serializable for storage in the durable queue store.
//! let json = job.serialize().unwrap();
//! let restored = Job::deserialize(&json).unwrap();
//! assert_eq!(job, restored);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::JobStatus;
use crate::error::{QueueError, Result};

/// Default maximum retry attempts for a job.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Process-wide identifier of a job, monotonically increasing for the life
/// of the system.
pub type JobId = u64;

/// Represents a background job and its lifecycle metadata.
///
/// Only minimal metadata is carried: a name label, the retry bookkeeping, the
/// current status, and the attempt timestamps. Payloads beyond the name are
/// intentionally out of scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Process-wide monotonically increasing identifier
    pub id: JobId,
    /// Free-form label describing the work
    pub name: String,
    /// Number of retry attempts consumed so far; never exceeds `max_retries`.
    /// Only the retry controller changes this field.
    pub retries: u32,
    /// Fixed retry budget for this job
    pub max_retries: u32,
    /// Current lifecycle status
    pub status: JobStatus,
    /// When the most recent execution attempt began
    pub started_at: Option<DateTime<Utc>>,
    /// When the job reached a terminal state
    pub ended_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Creates a new job at `QUEUED` with the default retry budget.
    pub fn new(id: JobId, name: impl Into<String>) -> Self {
        Self::with_max_retries(id, name, DEFAULT_MAX_RETRIES)
    }

    /// Creates a new job at `QUEUED` with an explicit retry budget.
    pub fn with_max_retries(id: JobId, name: impl Into<String>, max_retries: u32) -> Self {
        Self {
            id,
            name: name.into(),
            retries: 0,
            max_retries,
            status: JobStatus::Queued,
            started_at: None,
            ended_at: None,
        }
    }

    /// Serializes the job to a JSON document for storage.
    pub fn serialize(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| QueueError::Serialization {
            message: format!("failed to serialize job #{}: {}", self.id, e),
        })
    }

    /// Deserializes a job from a stored JSON document.
    pub fn deserialize(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| QueueError::Serialization {
            message: format!("failed to deserialize job record: {}", e),
        })
    }

    /// Checks whether the job still has retry budget left.
    pub fn has_retries_left(&self) -> bool {
        self.retries < self.max_retries
    }
}

/// Allocator for process-wide monotonic job ids.
///
/// An explicit shared object passed by reference to the components that need
/// it; there is no ambient global counter.
#[derive(Debug, Default)]
pub struct JobIdGenerator {
    counter: AtomicU64,
}

impl JobIdGenerator {
    /// Creates a generator starting at id 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next id. Ids are unique for the life of the process.
    pub fn next_id(&self) -> JobId {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}
