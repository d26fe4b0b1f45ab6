//! Runs the engine against a handler with randomized work durations and a
//! random failure rate, then prints what ended up where.
//!
//! ```sh
//! RUST_LOG=info cargo run --example processing_demo
//! ```

use std::sync::Arc;
use std::time::Duration;

use backburner::{
    InMemoryStore, Job, JobError, JobHandler, JobQueueServer, ServerConfig,
};

struct FlakyHandler;

#[async_trait::async_trait]
impl JobHandler for FlakyHandler {
    async fn run(&self, job: &Job) -> Result<(), JobError> {
        tokio::time::sleep(Duration::from_millis(fastrand::u64(50..400))).await;
        if fastrand::f32() < 0.3 {
            return Err(format!("transient error while running {}", job.name).into());
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> backburner::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = ServerConfig::new()
        .with_job_timeout(Duration::from_secs(1))
        .with_poll_interval(Duration::from_millis(100))
        .with_retry_base_delay(Duration::from_millis(200));
    let server = JobQueueServer::new(
        config,
        Arc::new(InMemoryStore::new()),
        Arc::new(FlakyHandler),
    )?;
    server.start().await?;

    for name in [
        "resize-avatar",
        "send-receipt",
        "sync-inventory",
        "rebuild-index",
        "export-ledger",
        "warm-cache",
        "purge-sessions",
        "notify-webhooks",
    ] {
        server.submit(name).await?;
    }

    // Give the pool time to chew through retries.
    tokio::time::sleep(Duration::from_secs(10)).await;
    server.stop().await;

    let metrics = server.metrics();
    println!("\n--- results ---");
    println!(
        "enqueued={} completed={} failed={} avg_duration={:.3}s",
        metrics.jobs_enqueued,
        metrics.jobs_completed,
        metrics.jobs_failed,
        metrics.average_duration_secs
    );

    for job in server.recent(20).await? {
        println!("  {:>2}  {:<16} {:?} (retries {})", job.id, job.name, job.status, job.retries);
    }

    let dead = server.dead_letters().list(20).await?;
    if !dead.is_empty() {
        println!("dead-lettered:");
        for job in dead {
            println!("  {:>2}  {:<16} retries {}", job.id, job.name, job.retries);
        }
    }

    Ok(())
}
