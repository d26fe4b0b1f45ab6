//! Retry decisions and exponential backoff.
//!
//! The retry controller is the single component allowed to change a job's
//! retry count. It turns an [`ExecutionOutcome`] into one of three
//! transitions: terminal success, a delayed retry through the store's
//! delayed holding area, or a move to the dead-letter collection.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::supervisor::ExecutionOutcome;
use crate::core::{Job, JobStatus};
use crate::error::Result;
use crate::metrics::QueueMetrics;
use crate::storage::QueueStore;

/// Default base delay for the exponential backoff.
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(5);

/// Exponential backoff policy for failed attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Base delay multiplied by `2^retry_count`
    pub base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base: DEFAULT_RETRY_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given base delay.
    pub fn new(base: Duration) -> Self {
        Self { base }
    }

    /// Backoff delay before the attempt that follows `retry_count` retries.
    ///
    /// The count passed in is the already-incremented one, so the first
    /// retry waits `base * 2`, the second `base * 4`, and so on. The
    /// doubling starting at `base * 2` rather than `base * 1` is kept
    /// intentionally for compatibility with existing deployments.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        self.base * 2u32.saturating_pow(retry_count)
    }
}

/// Decides what happens to a job after each execution attempt.
///
/// Stateless beyond the shared metrics: a decision function plus the
/// schedule-delayed and move-to-dead-letter side effects on the store.
pub struct RetryController {
    store: Arc<dyn QueueStore>,
    policy: RetryPolicy,
    metrics: Arc<QueueMetrics>,
}

impl RetryController {
    /// Create a controller over the given store and policy.
    pub fn new(store: Arc<dyn QueueStore>, policy: RetryPolicy, metrics: Arc<QueueMetrics>) -> Self {
        Self {
            store,
            policy,
            metrics,
        }
    }

    /// Apply the outcome of one attempt to the job and the store.
    ///
    /// Timeouts and failures take the same path: retry while budget remains,
    /// dead-letter once it is exhausted.
    pub async fn dispose(&self, job: &mut Job, outcome: ExecutionOutcome) -> Result<()> {
        match outcome {
            ExecutionOutcome::Success => self.complete(job).await,
            ExecutionOutcome::Failure | ExecutionOutcome::TimedOut => {
                if job.has_retries_left() {
                    self.schedule_retry(job).await
                } else {
                    self.dead_letter(job).await
                }
            }
        }
    }

    async fn complete(&self, job: &mut Job) -> Result<()> {
        job.status = JobStatus::Success;
        job.ended_at = Some(Utc::now());
        self.store.set_status(job.id, JobStatus::Success).await?;
        self.store.save_record(job).await?;
        self.metrics.incr_completed();
        info!(job_id = job.id, name = %job.name, "job succeeded");
        Ok(())
    }

    async fn schedule_retry(&self, job: &mut Job) -> Result<()> {
        job.retries += 1;
        let delay = self.policy.delay_for(job.retries);
        self.store.schedule_delayed(job, delay).await?;
        job.status = JobStatus::Retrying;
        self.store.set_status(job.id, JobStatus::Retrying).await?;
        self.store.save_record(job).await?;
        info!(
            job_id = job.id,
            retry = job.retries,
            delay_secs = delay.as_secs_f64(),
            "retrying job after backoff"
        );
        Ok(())
    }

    async fn dead_letter(&self, job: &mut Job) -> Result<()> {
        job.status = JobStatus::Failed;
        job.ended_at = Some(Utc::now());
        self.store.move_to_dead_letter(job).await?;
        self.store.set_status(job.id, JobStatus::Failed).await?;
        self.store.save_record(job).await?;
        self.metrics.incr_failed();
        if let Ok(size) = self.store.dead_letter_size().await {
            self.metrics.set_dead_letter_size(size);
        }
        warn!(
            job_id = job.id,
            name = %job.name,
            retries = job.retries,
            "job moved to dead-letter collection"
        );
        Ok(())
    }
}
