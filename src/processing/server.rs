//! Queue server: the assembled engine.
//!
//! Owns the store, the id generator, the worker pool, the delayed-job poller
//! and the dead-letter manager, and exposes the public surface callers use:
//! submit jobs, query status and history, inspect metrics, manage the
//! dead-letter collection, and start/stop the whole machine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::dead_letter::DeadLetterManager;
use super::poller::{DelayedJobPoller, DEFAULT_POLL_INTERVAL};
use super::retry::{RetryController, RetryPolicy, DEFAULT_RETRY_BASE_DELAY};
use super::supervisor::{ExecutionSupervisor, JobHandler};
use super::worker::Worker;
use crate::core::{Job, JobId, JobIdGenerator, JobStatus, DEFAULT_MAX_RETRIES};
use crate::error::{QueueError, Result};
use crate::metrics::{MetricsSnapshot, QueueMetrics};
use crate::storage::QueueStore;

/// Default number of concurrent worker loops.
pub const DEFAULT_WORKER_COUNT: usize = 3;

/// Default per-attempt execution timeout.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(3);

/// Tunables for a [`JobQueueServer`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Number of concurrent worker loops
    pub worker_count: usize,
    /// Per-attempt execution timeout
    pub job_timeout: Duration,
    /// Wake interval for the delayed-job poller
    pub poll_interval: Duration,
    /// Base delay for the exponential retry backoff
    pub retry_base_delay: Duration,
    /// Retry budget given to jobs submitted without an explicit one
    pub default_max_retries: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            job_timeout: DEFAULT_JOB_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            default_max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_retry_base_delay(mut self, base: Duration) -> Self {
        self.retry_base_delay = base;
        self
    }

    pub fn with_default_max_retries(mut self, max_retries: u32) -> Self {
        self.default_max_retries = max_retries;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(QueueError::Configuration {
                message: "worker_count must be at least 1".to_string(),
            });
        }
        if self.job_timeout.is_zero() {
            return Err(QueueError::Configuration {
                message: "job_timeout must be non-zero".to_string(),
            });
        }
        if self.poll_interval.is_zero() {
            return Err(QueueError::Configuration {
                message: "poll_interval must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

/// The job queue engine.
///
/// Construction wires the components together but starts nothing; call
/// [`start`](JobQueueServer::start) to spin up the worker pool and the
/// poller, and [`stop`](JobQueueServer::stop) to drain them. Submission and
/// queries work whether or not the engine is running.
pub struct JobQueueServer {
    config: ServerConfig,
    store: Arc<dyn QueueStore>,
    handler: Arc<dyn JobHandler>,
    ids: JobIdGenerator,
    metrics: Arc<QueueMetrics>,
    dead_letters: DeadLetterManager,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    is_running: AtomicBool,
}

impl JobQueueServer {
    /// Build a server over the given store and handler.
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn QueueStore>,
        handler: Arc<dyn JobHandler>,
    ) -> Result<Self> {
        config.validate()?;
        let metrics = Arc::new(QueueMetrics::new());
        let dead_letters = DeadLetterManager::new(store.clone(), metrics.clone());
        Ok(Self {
            config,
            store,
            handler,
            ids: JobIdGenerator::new(),
            metrics,
            dead_letters,
            shutdown: Mutex::new(None),
            handles: Mutex::new(Vec::new()),
            is_running: AtomicBool::new(false),
        })
    }

    /// Submit a job with the configured default retry budget.
    pub async fn submit(&self, name: impl Into<String>) -> Result<Job> {
        self.submit_with_max_retries(name, self.config.default_max_retries)
            .await
    }

    /// Submit a job with an explicit retry budget.
    ///
    /// Allocates the next id, persists the QUEUED record and places the job
    /// at the back of the main queue.
    pub async fn submit_with_max_retries(
        &self,
        name: impl Into<String>,
        max_retries: u32,
    ) -> Result<Job> {
        let job = Job::with_max_retries(self.ids.next_id(), name, max_retries);

        self.store.enqueue(&job).await?;
        self.store.set_status(job.id, JobStatus::Queued).await?;
        self.store.save_record(&job).await?;

        self.metrics.incr_enqueued();
        if let Ok(depth) = self.store.queue_depth().await {
            self.metrics.set_queue_depth(depth);
        }

        info!(job_id = job.id, name = %job.name, "job enqueued");
        Ok(job)
    }

    /// Current status of a job. `JobNotFound` if the id was never submitted
    /// or its record has been deleted.
    pub async fn status(&self, id: JobId) -> Result<JobStatus> {
        Ok(self.store.get_status(id).await?)
    }

    /// Up to `n` most recently finished jobs, newest first.
    pub async fn recent(&self, n: usize) -> Result<Vec<Job>> {
        Ok(self.store.list_recent(n).await?)
    }

    /// Dead-letter administration surface.
    pub fn dead_letters(&self) -> &DeadLetterManager {
        &self.dead_letters
    }

    /// Point-in-time snapshot of the engine's counters and gauges.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Whether the worker pool is currently running.
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Start the worker pool and the delayed-job poller.
    ///
    /// Fails with `AlreadyRunning` if the engine is already started.
    pub async fn start(&self) -> Result<()> {
        if self.is_running.swap(true, Ordering::SeqCst) {
            return Err(QueueError::AlreadyRunning);
        }

        let (tx, rx) = watch::channel(false);
        let mut handles = Vec::with_capacity(self.config.worker_count + 1);

        let supervisor = Arc::new(ExecutionSupervisor::new(
            self.handler.clone(),
            self.config.job_timeout,
            self.metrics.clone(),
        ));
        let retry = Arc::new(RetryController::new(
            self.store.clone(),
            RetryPolicy::new(self.config.retry_base_delay),
            self.metrics.clone(),
        ));

        for id in 0..self.config.worker_count {
            let worker = Worker {
                id,
                store: self.store.clone(),
                supervisor: supervisor.clone(),
                retry: retry.clone(),
                metrics: self.metrics.clone(),
            };
            handles.push(tokio::spawn(worker.run(rx.clone())));
        }

        let poller =
            DelayedJobPoller::with_interval(self.store.clone(), self.config.poll_interval);
        handles.push(tokio::spawn(poller.run(rx.clone())));

        *self.shutdown.lock().await = Some(tx);
        *self.handles.lock().await = handles;

        info!(
            workers = self.config.worker_count,
            timeout_secs = self.config.job_timeout.as_secs_f64(),
            "job queue server started"
        );
        Ok(())
    }

    /// Signal shutdown and wait for every loop to drain.
    ///
    /// Workers finish any in-flight attempt before exiting; nothing is
    /// aborted. Idempotent when the engine is not running.
    pub async fn stop(&self) {
        if !self.is_running.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Some(tx) = self.shutdown.lock().await.take() {
            let _ = tx.send(true);
        }

        for handle in self.handles.lock().await.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task ended abnormally");
            }
        }

        info!("job queue server stopped");
    }
}
