//! Core data model: the job record and its lifecycle status.

pub mod job;
pub mod status;

pub use job::{Job, JobId, JobIdGenerator, DEFAULT_MAX_RETRIES};
pub use status::JobStatus;
