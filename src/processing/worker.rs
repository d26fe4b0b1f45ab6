//! Worker dispatch loops.
//!
//! Each worker blocks on the store's main-queue dequeue, takes ownership of
//! one job at a time, marks it PROCESSING before running it, and hands the
//! outcome to the retry controller. A store error never kills a worker; the
//! loop logs it and keeps going.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::retry::RetryController;
use super::supervisor::ExecutionSupervisor;
use crate::core::JobStatus;
use crate::metrics::QueueMetrics;
use crate::storage::QueueStore;

/// Pause before retrying after a dequeue error, so a down store does not
/// spin the loop.
const DEQUEUE_RETRY_PAUSE: Duration = Duration::from_secs(1);

/// One dispatch loop of the worker pool.
pub(crate) struct Worker {
    pub(crate) id: usize,
    pub(crate) store: Arc<dyn QueueStore>,
    pub(crate) supervisor: Arc<ExecutionSupervisor>,
    pub(crate) retry: Arc<RetryController>,
    pub(crate) metrics: Arc<QueueMetrics>,
}

impl Worker {
    /// Run the dispatch loop until the shutdown signal flips.
    ///
    /// The loop only observes shutdown while waiting for work, so an
    /// in-flight attempt always finishes (or times out) before the worker
    /// exits.
    pub(crate) async fn run(self, mut shutdown: watch::Receiver<bool>) {
        debug!(worker = self.id, "worker started");

        loop {
            let mut job = tokio::select! {
                _ = shutdown.changed() => break,
                dequeued = self.store.dequeue() => match dequeued {
                    Ok(job) => job,
                    Err(e) => {
                        warn!(worker = self.id, error = %e, "dequeue failed, retrying");
                        tokio::time::sleep(DEQUEUE_RETRY_PAUSE).await;
                        continue;
                    }
                }
            };

            if let Ok(depth) = self.store.queue_depth().await {
                self.metrics.set_queue_depth(depth);
            }

            // Persist ownership before doing anything else: once a worker
            // holds the job it must never read as QUEUED to an observer.
            job.status = JobStatus::Processing;
            job.started_at = Some(Utc::now());
            if let Err(e) = self.store.set_status(job.id, JobStatus::Processing).await {
                warn!(worker = self.id, job_id = job.id, error = %e, "failed to persist PROCESSING status");
            }
            if let Err(e) = self.store.save_record(&job).await {
                warn!(worker = self.id, job_id = job.id, error = %e, "failed to persist job record");
            }

            info!(worker = self.id, job_id = job.id, name = %job.name, "job started");

            let outcome = self.supervisor.execute(&job).await;

            if let Err(e) = self.retry.dispose(&mut job, outcome).await {
                error!(worker = self.id, job_id = job.id, error = %e, "failed to record job outcome");
            }
        }

        debug!(worker = self.id, "worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Job;
    use crate::processing::retry::RetryPolicy;
    use crate::processing::supervisor::{JobError, JobHandler};
    use crate::storage::InMemoryStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingHandler {
        calls: AtomicU32,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl JobHandler for CountingHandler {
        async fn run(&self, _job: &Job) -> Result<(), JobError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err("scripted failure".into())
            } else {
                Ok(())
            }
        }
    }

    async fn wait_for_status(store: &InMemoryStore, id: u64, want: JobStatus) {
        for _ in 0..200 {
            if let Ok(status) = store.get_status(id).await {
                if status == want {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job #{} never reached {:?}", id, want);
    }

    #[tokio::test]
    async fn worker_processes_queued_job_to_success() {
        let store = Arc::new(InMemoryStore::new());
        let handler = Arc::new(CountingHandler {
            calls: AtomicU32::new(0),
            fail: false,
        });
        let metrics = Arc::new(QueueMetrics::new());
        let supervisor = Arc::new(ExecutionSupervisor::new(
            handler.clone(),
            Duration::from_millis(200),
            metrics.clone(),
        ));
        let retry = Arc::new(RetryController::new(
            store.clone(),
            RetryPolicy::new(Duration::from_millis(10)),
            metrics.clone(),
        ));
        let (tx, rx) = watch::channel(false);

        let job = Job::new(1, "one-shot");
        store.enqueue(&job).await.unwrap();

        let handle = tokio::spawn(
            Worker {
                id: 0,
                store: store.clone(),
                supervisor,
                retry,
                metrics,
            }
            .run(rx),
        );

        wait_for_status(&store, 1, JobStatus::Success).await;
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn failing_job_lands_in_delayed_area_as_retrying() {
        let store = Arc::new(InMemoryStore::new());
        let handler = Arc::new(CountingHandler {
            calls: AtomicU32::new(0),
            fail: true,
        });
        let metrics = Arc::new(QueueMetrics::new());
        let supervisor = Arc::new(ExecutionSupervisor::new(
            handler.clone(),
            Duration::from_millis(200),
            metrics.clone(),
        ));
        let retry = Arc::new(RetryController::new(
            store.clone(),
            RetryPolicy::new(Duration::from_millis(10)),
            metrics.clone(),
        ));
        let (tx, rx) = watch::channel(false);

        store.enqueue(&Job::new(2, "flaky")).await.unwrap();

        let handle = tokio::spawn(
            Worker {
                id: 1,
                store: store.clone(),
                supervisor,
                retry,
                metrics,
            }
            .run(rx),
        );

        wait_for_status(&store, 2, JobStatus::Retrying).await;
        assert_eq!(store.delayed_len(), 1);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
