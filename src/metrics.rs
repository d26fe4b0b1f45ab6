//! Observability counters and gauges.
//!
//! The engine updates these as side effects of the operations that own them:
//! the server increments the enqueue counter, the retry controller increments
//! completion/failure counters, the execution supervisor records duration
//! samples, and the store-facing components refresh the depth gauges.
//!
//! Everything lives behind one explicit shared [`QueueMetrics`] object that
//! is passed by `Arc` to the components that need it; there are no ambient
//! globals. Exporting (Prometheus or otherwise) is an external concern built
//! on top of [`QueueMetrics::snapshot`].

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Running duration accumulator for execution attempts.
///
/// Success, failure and timeout all count toward the mean: the sample is the
/// wall-clock time from dispatch to outcome, whatever the outcome was.
#[derive(Debug, Default)]
struct DurationStats {
    latest_secs: f64,
    total_secs: f64,
    samples: u64,
}

/// Shared counters and gauges for the queue engine.
#[derive(Debug, Default)]
pub struct QueueMetrics {
    jobs_enqueued: AtomicU64,
    jobs_completed: AtomicU64,
    jobs_failed: AtomicU64,
    queue_depth: AtomicU64,
    dead_letter_size: AtomicU64,
    durations: Mutex<DurationStats>,
}

impl QueueMetrics {
    /// Creates a zeroed metrics object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total jobs submitted to the main queue.
    pub fn incr_enqueued(&self) {
        self.jobs_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Total jobs that reached SUCCESS.
    pub fn incr_completed(&self) {
        self.jobs_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Total jobs that reached FAILED (dead-lettered).
    pub fn incr_failed(&self) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Sets the current main-queue depth gauge.
    pub fn set_queue_depth(&self, depth: usize) {
        self.queue_depth.store(depth as u64, Ordering::Relaxed);
    }

    /// Sets the current dead-letter collection size gauge.
    pub fn set_dead_letter_size(&self, size: usize) {
        self.dead_letter_size.store(size as u64, Ordering::Relaxed);
    }

    /// Records one execution-attempt duration sample, updating the latest
    /// value and the running arithmetic mean.
    pub fn record_duration(&self, duration: Duration) {
        let secs = duration.as_secs_f64();
        let mut stats = self.durations.lock().unwrap();
        stats.latest_secs = secs;
        stats.total_secs += secs;
        stats.samples += 1;
    }

    /// Takes a point-in-time copy of all counters and gauges.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let stats = self.durations.lock().unwrap();
        let average = if stats.samples == 0 {
            0.0
        } else {
            stats.total_secs / stats.samples as f64
        };
        MetricsSnapshot {
            jobs_enqueued: self.jobs_enqueued.load(Ordering::Relaxed),
            jobs_completed: self.jobs_completed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
            dead_letter_size: self.dead_letter_size.load(Ordering::Relaxed),
            latest_duration_secs: stats.latest_secs,
            average_duration_secs: average,
            duration_samples: stats.samples,
        }
    }
}

/// Point-in-time view of the engine's counters and gauges, suitable for an
/// external HTTP or metrics surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub jobs_enqueued: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub queue_depth: u64,
    pub dead_letter_size: u64,
    pub latest_duration_secs: f64,
    pub average_duration_secs: f64,
    pub duration_samples: u64,
}
