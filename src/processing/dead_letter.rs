//! Dead-letter management.
//!
//! Administrative operations over jobs that exhausted their retry budget:
//! listing for inspection, retrying a job back into the main queue with a
//! fresh retry budget, and permanent deletion. Deletion is the only path
//! that destroys a job record.

use std::sync::Arc;
use tracing::info;

use crate::core::{Job, JobId, JobStatus};
use crate::error::Result;
use crate::metrics::QueueMetrics;
use crate::storage::QueueStore;

/// Exposes list/retry/delete over the dead-letter collection.
pub struct DeadLetterManager {
    store: Arc<dyn QueueStore>,
    metrics: Arc<QueueMetrics>,
}

impl DeadLetterManager {
    /// Create a manager over the given store.
    pub fn new(store: Arc<dyn QueueStore>, metrics: Arc<QueueMetrics>) -> Self {
        Self { store, metrics }
    }

    /// Up to `n` dead-lettered jobs, most recently added first.
    pub async fn list(&self, n: usize) -> Result<Vec<Job>> {
        Ok(self.store.list_dead_letter(n).await?)
    }

    /// Pull one job out of the dead-letter collection and resubmit it.
    ///
    /// Removes exactly one entry matching `id`, resets the retry count to
    /// zero and re-enqueues the job at QUEUED. Returns the resubmitted job.
    /// Fails with `JobNotFound` and mutates nothing if no entry matches.
    pub async fn retry(&self, id: JobId) -> Result<Job> {
        let mut job = self.store.remove_dead_letter(id).await?;
        job.retries = 0;
        job.status = JobStatus::Queued;
        job.started_at = None;
        job.ended_at = None;

        self.store.enqueue(&job).await?;
        self.store.set_status(job.id, JobStatus::Queued).await?;
        self.store.save_record(&job).await?;
        self.refresh_gauge().await;

        info!(job_id = job.id, name = %job.name, "dead-lettered job resubmitted");
        Ok(job)
    }

    /// Permanently remove a dead-lettered job and its record.
    ///
    /// Fails with `JobNotFound` if no entry matches `id`.
    pub async fn delete(&self, id: JobId) -> Result<()> {
        let job = self.store.remove_dead_letter(id).await?;
        self.store.delete_record(job.id).await?;
        self.refresh_gauge().await;

        info!(job_id = job.id, name = %job.name, "dead-lettered job deleted");
        Ok(())
    }

    async fn refresh_gauge(&self) {
        if let Ok(size) = self.store.dead_letter_size().await {
            self.metrics.set_dead_letter_size(size);
        }
    }
}
