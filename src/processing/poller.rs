//! Delayed-job promotion.
//!
//! A single background loop, independent of the worker pool, that wakes on a
//! fixed interval and moves due jobs from the delayed holding area back into
//! the main queue. Promotion latency of up to one interval is by design.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::storage::QueueStore;

/// Default wake interval for the poller.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Background loop that re-feeds due delayed jobs into the main FIFO.
pub struct DelayedJobPoller {
    store: Arc<dyn QueueStore>,
    interval: Duration,
}

impl DelayedJobPoller {
    /// Create a poller with the default 1s interval.
    pub fn new(store: Arc<dyn QueueStore>) -> Self {
        Self::with_interval(store, DEFAULT_POLL_INTERVAL)
    }

    /// Create a poller with a custom wake interval.
    pub fn with_interval(store: Arc<dyn QueueStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Run the polling loop until the shutdown signal flips.
    ///
    /// A store read error skips the tick and the loop simply waits for the
    /// next one; it is never fatal.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs_f64(), "delayed-job poller started");
        let mut ticker = interval(self.interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.promote_due_jobs(Utc::now()).await {
                warn!(error = %e, "delayed poll failed, skipping tick");
            }
        }

        info!("delayed-job poller stopped");
    }

    /// Move every job due at or before `now` into the main queue.
    ///
    /// Jobs are copied into the FIFO first and removed from the holding area
    /// second, so an interruption in between duplicates a job rather than
    /// losing it. Returns the number of jobs promoted.
    pub async fn promote_due_jobs(&self, now: DateTime<Utc>) -> Result<usize> {
        let due = self.store.poll_due_delayed(now).await?;
        let mut promoted = 0;

        for job in due {
            if let Err(e) = self.store.enqueue(&job).await {
                warn!(job_id = job.id, error = %e, "failed to requeue delayed job");
                continue;
            }
            if let Err(e) = self.store.remove_delayed(&job).await {
                warn!(job_id = job.id, error = %e, "failed to remove promoted job from delayed area");
            }
            debug!(job_id = job.id, "promoted delayed job to main queue");
            promoted += 1;
        }

        Ok(promoted)
    }
}
