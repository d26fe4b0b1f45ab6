//! Job processing: supervision, retry, workers, delayed promotion,
//! dead-letter administration and the assembled server.

pub mod dead_letter;
pub mod poller;
pub mod retry;
pub mod server;
pub mod supervisor;
mod worker;

pub use dead_letter::DeadLetterManager;
pub use poller::{DelayedJobPoller, DEFAULT_POLL_INTERVAL};
pub use retry::{RetryController, RetryPolicy, DEFAULT_RETRY_BASE_DELAY};
pub use server::{JobQueueServer, ServerConfig, DEFAULT_JOB_TIMEOUT, DEFAULT_WORKER_COUNT};
pub use supervisor::{ExecutionOutcome, ExecutionSupervisor, JobError, JobHandler};
