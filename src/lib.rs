//! backburner: a background job queue engine.
//!
//! Jobs are submitted by name, held in a FIFO queue, and executed by a small
//! pool of workers under a per-attempt timeout. Failed or timed-out attempts
//! are retried with exponential backoff through a delayed holding area; jobs
//! that exhaust their retry budget land in a dead-letter collection that can
//! be inspected, retried or purged.
//!
//! The storage layer is a trait ([`QueueStore`]) with an in-memory
//! implementation ([`InMemoryStore`]); the engine itself is storage-agnostic.
//!
//! ```no_run
//! use std::sync::Arc;
//! use backburner::{
//!     InMemoryStore, Job, JobError, JobHandler, JobQueueServer, ServerConfig,
//! };
//!
//! struct PrintHandler;
//!
//! #[async_trait::async_trait]
//! impl JobHandler for PrintHandler {
//!     async fn run(&self, job: &Job) -> Result<(), JobError> {
//!         println!("working on {}", job.name);
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> backburner::Result<()> {
//!     let server = JobQueueServer::new(
//!         ServerConfig::default(),
//!         Arc::new(InMemoryStore::new()),
//!         Arc::new(PrintHandler),
//!     )?;
//!     server.start().await?;
//!     server.submit("send-welcome-email").await?;
//!     server.stop().await;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod error;
pub mod metrics;
pub mod processing;
pub mod storage;

pub use crate::core::{Job, JobId, JobIdGenerator, JobStatus, DEFAULT_MAX_RETRIES};
pub use crate::error::{QueueError, Result};
pub use crate::metrics::{MetricsSnapshot, QueueMetrics};
pub use crate::processing::{
    DeadLetterManager, DelayedJobPoller, ExecutionOutcome, ExecutionSupervisor, JobError,
    JobHandler, JobQueueServer, RetryController, RetryPolicy, ServerConfig,
};
pub use crate::storage::{InMemoryStore, QueueStore, StorageError};
