//! The durable queue store interface.
//!
//! The store is the only shared mutable state between worker processes: a
//! FIFO main queue, a time-scored delayed holding area, a dead-letter
//! collection, and a record/status map for history and inspection. Atomicity
//! of individual push/pop/remove operations is the store's responsibility,
//! not the engine's.
//!
//! The engine ships with [`InMemoryStore`], a process-local reference
//! implementation used for development and testing. Durable backends (Redis,
//! a relational database, ...) implement the same [`QueueStore`] trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::core::{Job, JobId, JobStatus};

pub mod error;
pub mod memory;

pub use error::StorageError;
pub use memory::InMemoryStore;

/// Interface the job lifecycle engine consumes for all shared queue state.
///
/// ## Collections
///
/// - **Main queue**: FIFO of jobs ready for immediate dispatch.
/// - **Delayed holding area**: jobs waiting out a retry backoff, keyed by an
///   absolute due-time.
/// - **Dead-letter collection**: jobs that exhausted their retry budget,
///   newest first.
/// - **Records**: the persisted job documents plus a status index, kept even
///   after a job terminates so history can be inspected.
///
/// All operations fail only on store unavailability, except the lookups that
/// document a `JobNotFound` case.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Push a job onto the back of the main FIFO.
    async fn enqueue(&self, job: &Job) -> Result<(), StorageError>;

    /// Blocking pop from the front of the main FIFO.
    ///
    /// Suspends the caller until a job is available; there is no timeout and
    /// no busy-polling.
    async fn dequeue(&self) -> Result<Job, StorageError>;

    /// Insert a job into the delayed holding area, due at `now + delay`.
    async fn schedule_delayed(&self, job: &Job, delay: Duration) -> Result<(), StorageError>;

    /// All delayed jobs whose due-time is at or before `now`, in
    /// score-ascending order (ties in arbitrary order).
    ///
    /// `now` is passed explicitly so callers control the clock.
    async fn poll_due_delayed(&self, now: DateTime<Utc>) -> Result<Vec<Job>, StorageError>;

    /// Remove a job from the delayed holding area, matched by id.
    async fn remove_delayed(&self, job: &Job) -> Result<(), StorageError>;

    /// Add a job to the dead-letter collection (newest first).
    async fn move_to_dead_letter(&self, job: &Job) -> Result<(), StorageError>;

    /// Up to `n` dead-lettered jobs, most recently added first.
    async fn list_dead_letter(&self, n: usize) -> Result<Vec<Job>, StorageError>;

    /// Remove exactly one dead-letter entry matching `id` and return it.
    ///
    /// Fails with [`StorageError::JobNotFound`] if no entry matches; the
    /// collection is left unchanged in that case.
    async fn remove_dead_letter(&self, id: JobId) -> Result<Job, StorageError>;

    /// Set the externally visible status of a job.
    async fn set_status(&self, id: JobId, status: JobStatus) -> Result<(), StorageError>;

    /// Read the externally visible status of a job.
    async fn get_status(&self, id: JobId) -> Result<JobStatus, StorageError>;

    /// Upsert the persisted record for a job. Jobs reaching a terminal status
    /// are also appended to the history list.
    async fn save_record(&self, job: &Job) -> Result<(), StorageError>;

    /// Up to `n` records from the history list, most recent first.
    ///
    /// Malformed stored records are skipped, never aborting the listing.
    async fn list_recent(&self, n: usize) -> Result<Vec<Job>, StorageError>;

    /// Delete the persisted record and status for a job.
    async fn delete_record(&self, id: JobId) -> Result<(), StorageError>;

    /// Number of jobs currently waiting in the main queue.
    async fn queue_depth(&self) -> Result<usize, StorageError>;

    /// Number of jobs currently in the dead-letter collection.
    async fn dead_letter_size(&self) -> Result<usize, StorageError>;
}
