//! Execution supervision with timeout enforcement.
//!
//! The supervisor runs one job attempt in an isolated task and produces
//! exactly one outcome: success, failure, or timeout. A timed-out attempt is
//! abandoned, not cancelled; whatever the abandoned task eventually does is
//! ignored and cannot affect the job record.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::core::Job;
use crate::metrics::QueueMetrics;

/// Error type produced by user-supplied job handlers.
pub type JobError = Box<dyn std::error::Error + Send + Sync>;

/// Trait for executing the work behind a job.
///
/// One handler serves the whole queue; jobs carry a name label rather than a
/// dispatch key. Returning `Err` marks the attempt as failed and routes it
/// through the retry controller.
#[async_trait::async_trait]
pub trait JobHandler: Send + Sync {
    /// Execute one attempt of the given job.
    async fn run(&self, job: &Job) -> Result<(), JobError>;
}

/// The result of one supervised execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The handler returned Ok within the timeout
    Success,
    /// The handler returned Err or panicked within the timeout
    Failure,
    /// The timeout fired first; the attempt was abandoned
    TimedOut,
}

impl ExecutionOutcome {
    /// Timeouts and failures are indistinguishable to the retry controller.
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success)
    }
}

/// Runs job attempts in isolation and enforces the execution timeout.
pub struct ExecutionSupervisor {
    handler: Arc<dyn JobHandler>,
    timeout: Duration,
    metrics: Arc<QueueMetrics>,
}

impl ExecutionSupervisor {
    /// Create a supervisor with the given handler and timeout.
    pub fn new(handler: Arc<dyn JobHandler>, timeout: Duration, metrics: Arc<QueueMetrics>) -> Self {
        Self {
            handler,
            timeout,
            metrics,
        }
    }

    /// Run one attempt of `job` to completion or timeout.
    ///
    /// The wall-clock duration from dispatch to outcome is recorded into the
    /// shared metrics for every outcome, timeout included. On timeout the
    /// spawned task keeps running detached; its result, if any, is discarded
    /// so a spuriously slow success can never overwrite the timeout verdict.
    pub async fn execute(&self, job: &Job) -> ExecutionOutcome {
        let start = Instant::now();

        let handler = Arc::clone(&self.handler);
        let attempt_job = job.clone();
        let attempt = tokio::spawn(async move { handler.run(&attempt_job).await });

        let outcome = tokio::select! {
            joined = attempt => match joined {
                Ok(Ok(())) => ExecutionOutcome::Success,
                Ok(Err(e)) => {
                    debug!(job_id = job.id, error = %e, "job attempt failed");
                    ExecutionOutcome::Failure
                }
                Err(e) => {
                    warn!(job_id = job.id, error = %e, "job attempt panicked");
                    ExecutionOutcome::Failure
                }
            },
            _ = sleep(self.timeout) => {
                // The attempt task is dropped here, which detaches rather
                // than aborts it.
                warn!(job_id = job.id, timeout_secs = self.timeout.as_secs_f64(), "job attempt timed out");
                ExecutionOutcome::TimedOut
            }
        };

        self.metrics.record_duration(start.elapsed());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct OkHandler;

    #[async_trait::async_trait]
    impl JobHandler for OkHandler {
        async fn run(&self, _job: &Job) -> Result<(), JobError> {
            Ok(())
        }
    }

    struct ErrHandler;

    #[async_trait::async_trait]
    impl JobHandler for ErrHandler {
        async fn run(&self, _job: &Job) -> Result<(), JobError> {
            Err("boom".into())
        }
    }

    struct SlowHandler {
        work: Duration,
        finished: Arc<AtomicBool>,
    }

    #[async_trait::async_trait]
    impl JobHandler for SlowHandler {
        async fn run(&self, _job: &Job) -> Result<(), JobError> {
            sleep(self.work).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn supervisor(handler: Arc<dyn JobHandler>, timeout: Duration) -> ExecutionSupervisor {
        ExecutionSupervisor::new(handler, timeout, Arc::new(QueueMetrics::new()))
    }

    #[tokio::test]
    async fn success_within_timeout() {
        let sup = supervisor(Arc::new(OkHandler), Duration::from_secs(1));
        let outcome = sup.execute(&Job::new(1, "quick")).await;
        assert_eq!(outcome, ExecutionOutcome::Success);
    }

    #[tokio::test]
    async fn handler_error_is_failure() {
        let sup = supervisor(Arc::new(ErrHandler), Duration::from_secs(1));
        let outcome = sup.execute(&Job::new(2, "broken")).await;
        assert_eq!(outcome, ExecutionOutcome::Failure);
    }

    #[tokio::test]
    async fn slow_attempt_times_out() {
        let finished = Arc::new(AtomicBool::new(false));
        let sup = supervisor(
            Arc::new(SlowHandler {
                work: Duration::from_secs(10),
                finished: finished.clone(),
            }),
            Duration::from_millis(20),
        );
        let outcome = sup.execute(&Job::new(3, "stuck")).await;
        assert_eq!(outcome, ExecutionOutcome::TimedOut);
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn late_success_does_not_override_timeout() {
        let finished = Arc::new(AtomicBool::new(false));
        let sup = supervisor(
            Arc::new(SlowHandler {
                work: Duration::from_millis(50),
                finished: finished.clone(),
            }),
            Duration::from_millis(10),
        );

        let outcome = sup.execute(&Job::new(4, "slow-success")).await;
        assert_eq!(outcome, ExecutionOutcome::TimedOut);

        // Let the abandoned attempt run to completion; the verdict already
        // stands and nothing observes the late result.
        sleep(Duration::from_millis(100)).await;
        assert!(finished.load(Ordering::SeqCst));
        assert_eq!(outcome, ExecutionOutcome::TimedOut);
    }

    #[tokio::test]
    async fn every_outcome_records_a_duration_sample() {
        let metrics = Arc::new(QueueMetrics::new());
        let ok = ExecutionSupervisor::new(Arc::new(OkHandler), Duration::from_secs(1), metrics.clone());
        let err = ExecutionSupervisor::new(Arc::new(ErrHandler), Duration::from_secs(1), metrics.clone());
        let slow = ExecutionSupervisor::new(
            Arc::new(SlowHandler {
                work: Duration::from_secs(10),
                finished: Arc::new(AtomicBool::new(false)),
            }),
            Duration::from_millis(10),
            metrics.clone(),
        );

        ok.execute(&Job::new(1, "a")).await;
        err.execute(&Job::new(2, "b")).await;
        slow.execute(&Job::new(3, "c")).await;

        assert_eq!(metrics.snapshot().duration_samples, 3);
    }
}
