use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::warn;

use super::{QueueStore, StorageError};
use crate::core::{Job, JobId, JobStatus};

#[derive(Debug, Default)]
struct StoreState {
    /// Main FIFO, front is the next job to dispatch
    main: VecDeque<Job>,
    /// Delayed holding area, kept sorted by due-time ascending
    delayed: Vec<(DateTime<Utc>, Job)>,
    /// Dead-letter collection, newest entry first
    dead: Vec<Job>,
    /// Persisted job documents, stored serialized like a durable backend would
    records: HashMap<JobId, String>,
    statuses: HashMap<JobId, JobStatus>,
    /// Ids of jobs that reached a terminal status, newest first
    history: Vec<JobId>,
}

/// In-memory queue store implementation.
///
/// Keeps all collections behind a single mutex and wakes blocked `dequeue`
/// callers through a [`Notify`]. Job records are held as serialized JSON,
/// matching what a durable backend persists, so the malformed-record
/// handling of [`list_recent`](QueueStore::list_recent) is exercised for
/// real. Intended for development and testing; it provides the same
/// atomicity guarantees per operation that the engine expects from a
/// durable store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    /// Signals blocked dequeue callers that the main queue gained a job
    available: Notify,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs currently waiting in the main queue.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().main.len()
    }

    /// Whether the main queue is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of jobs currently in the delayed holding area.
    pub fn delayed_len(&self) -> usize {
        self.state.lock().unwrap().delayed.len()
    }

    /// The absolute due-time of a delayed job, if it is being held.
    pub fn delayed_due_at(&self, id: JobId) -> Option<DateTime<Utc>> {
        let state = self.state.lock().unwrap();
        state
            .delayed
            .iter()
            .find(|(_, job)| job.id == id)
            .map(|(due, _)| *due)
    }

    /// Drop every job and record. Test helper.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        *state = StoreState::default();
    }
}

#[async_trait]
impl QueueStore for InMemoryStore {
    async fn enqueue(&self, job: &Job) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        state.main.push_back(job.clone());
        drop(state);
        self.available.notify_one();
        Ok(())
    }

    async fn dequeue(&self) -> Result<Job, StorageError> {
        loop {
            // Arm the notification before checking the queue so an enqueue
            // racing with the check cannot be missed.
            let notified = self.available.notified();

            let popped = {
                let mut state = self.state.lock().unwrap();
                let job = state.main.pop_front();
                if job.is_some() && !state.main.is_empty() {
                    // Pass the wakeup on: notify_one stores at most one
                    // permit, so burst enqueues need re-notification.
                    self.available.notify_one();
                }
                job
            };

            match popped {
                Some(job) => return Ok(job),
                None => notified.await,
            }
        }
    }

    async fn schedule_delayed(&self, job: &Job, delay: Duration) -> Result<(), StorageError> {
        let due = Utc::now()
            + chrono::Duration::from_std(delay).map_err(|e| {
                StorageError::operation_failed("schedule_delayed", e.to_string())
            })?;
        let mut state = self.state.lock().unwrap();
        let pos = state.delayed.partition_point(|(d, _)| *d <= due);
        state.delayed.insert(pos, (due, job.clone()));
        Ok(())
    }

    async fn poll_due_delayed(&self, now: DateTime<Utc>) -> Result<Vec<Job>, StorageError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .delayed
            .iter()
            .take_while(|(due, _)| *due <= now)
            .map(|(_, job)| job.clone())
            .collect())
    }

    async fn remove_delayed(&self, job: &Job) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        if let Some(pos) = state.delayed.iter().position(|(_, j)| j.id == job.id) {
            state.delayed.remove(pos);
        }
        Ok(())
    }

    async fn move_to_dead_letter(&self, job: &Job) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        state.dead.insert(0, job.clone());
        Ok(())
    }

    async fn list_dead_letter(&self, n: usize) -> Result<Vec<Job>, StorageError> {
        let state = self.state.lock().unwrap();
        Ok(state.dead.iter().take(n).cloned().collect())
    }

    async fn remove_dead_letter(&self, id: JobId) -> Result<Job, StorageError> {
        let mut state = self.state.lock().unwrap();
        match state.dead.iter().position(|j| j.id == id) {
            Some(pos) => Ok(state.dead.remove(pos)),
            None => Err(StorageError::job_not_found(id)),
        }
    }

    async fn set_status(&self, id: JobId, status: JobStatus) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        state.statuses.insert(id, status);
        Ok(())
    }

    async fn get_status(&self, id: JobId) -> Result<JobStatus, StorageError> {
        let state = self.state.lock().unwrap();
        state
            .statuses
            .get(&id)
            .copied()
            .ok_or_else(|| StorageError::job_not_found(id))
    }

    async fn save_record(&self, job: &Job) -> Result<(), StorageError> {
        let json = job
            .serialize()
            .map_err(|e| StorageError::serialization(e.to_string()))?;
        let mut state = self.state.lock().unwrap();
        state.records.insert(job.id, json);
        if job.status.is_terminal() && state.history.first() != Some(&job.id) {
            state.history.insert(0, job.id);
        }
        Ok(())
    }

    async fn list_recent(&self, n: usize) -> Result<Vec<Job>, StorageError> {
        let state = self.state.lock().unwrap();
        let mut out = Vec::new();
        for id in state.history.iter().take(n) {
            let Some(json) = state.records.get(id) else {
                continue;
            };
            match Job::deserialize(json) {
                Ok(job) => out.push(job),
                Err(e) => {
                    // Malformed record: skip it rather than failing the listing.
                    warn!(job_id = id, error = %e, "skipping malformed job record");
                }
            }
        }
        Ok(out)
    }

    async fn delete_record(&self, id: JobId) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        state.records.remove(&id);
        state.statuses.remove(&id);
        state.history.retain(|h| *h != id);
        Ok(())
    }

    async fn queue_depth(&self) -> Result<usize, StorageError> {
        Ok(self.state.lock().unwrap().main.len())
    }

    async fn dead_letter_size(&self) -> Result<usize, StorageError> {
        Ok(self.state.lock().unwrap().dead.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn job(id: JobId) -> Job {
        Job::new(id, format!("job-{}", id))
    }

    #[tokio::test]
    async fn enqueue_dequeue_is_fifo() {
        let store = InMemoryStore::new();
        store.enqueue(&job(1)).await.unwrap();
        store.enqueue(&job(2)).await.unwrap();
        store.enqueue(&job(3)).await.unwrap();

        assert_eq!(store.queue_depth().await.unwrap(), 3);
        assert_eq!(store.dequeue().await.unwrap().id, 1);
        assert_eq!(store.dequeue().await.unwrap().id, 2);
        assert_eq!(store.dequeue().await.unwrap().id, 3);
        assert_eq!(store.queue_depth().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn dequeue_blocks_until_job_arrives() {
        let store = Arc::new(InMemoryStore::new());

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move { store.dequeue().await.unwrap().id })
        };

        // Give the waiter time to block on the empty queue.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        store.enqueue(&job(9)).await.unwrap();
        assert_eq!(waiter.await.unwrap(), 9);
    }

    #[tokio::test]
    async fn burst_enqueue_wakes_all_waiters() {
        let store = Arc::new(InMemoryStore::new());

        let waiters: Vec<_> = (0..2)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.dequeue().await.unwrap().id })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        store.enqueue(&job(1)).await.unwrap();
        store.enqueue(&job(2)).await.unwrap();

        let mut got: Vec<u64> = Vec::new();
        for w in waiters {
            got.push(w.await.unwrap());
        }
        got.sort_unstable();
        assert_eq!(got, vec![1, 2]);
    }

    #[tokio::test]
    async fn delayed_jobs_become_due_in_score_order() {
        let store = InMemoryStore::new();
        store
            .schedule_delayed(&job(1), Duration::from_secs(10))
            .await
            .unwrap();
        store
            .schedule_delayed(&job(2), Duration::from_secs(5))
            .await
            .unwrap();

        // Nothing is due yet at the current wall clock.
        assert!(store.poll_due_delayed(Utc::now()).await.unwrap().is_empty());

        // Advance the observation point instead of the wall clock.
        let later = Utc::now() + chrono::Duration::seconds(7);
        let due = store.poll_due_delayed(later).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, 2);

        let much_later = Utc::now() + chrono::Duration::seconds(60);
        let due = store.poll_due_delayed(much_later).await.unwrap();
        assert_eq!(due.iter().map(|j| j.id).collect::<Vec<_>>(), vec![2, 1]);

        store.remove_delayed(&job(2)).await.unwrap();
        assert_eq!(store.delayed_len(), 1);
    }

    #[tokio::test]
    async fn dead_letter_collection_is_newest_first() {
        let store = InMemoryStore::new();
        store.move_to_dead_letter(&job(1)).await.unwrap();
        store.move_to_dead_letter(&job(2)).await.unwrap();

        let listed = store.list_dead_letter(10).await.unwrap();
        assert_eq!(listed.iter().map(|j| j.id).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(store.dead_letter_size().await.unwrap(), 2);

        let removed = store.remove_dead_letter(1).await.unwrap();
        assert_eq!(removed.id, 1);
        assert_eq!(store.dead_letter_size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn remove_dead_letter_takes_exactly_one_duplicate() {
        let store = InMemoryStore::new();
        // Same id dead-lettered twice (duplicate payloads).
        store.move_to_dead_letter(&job(5)).await.unwrap();
        store.move_to_dead_letter(&job(5)).await.unwrap();

        store.remove_dead_letter(5).await.unwrap();
        assert_eq!(store.dead_letter_size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn remove_dead_letter_absent_id_is_not_found() {
        let store = InMemoryStore::new();
        store.move_to_dead_letter(&job(1)).await.unwrap();

        let err = store.remove_dead_letter(99).await.unwrap_err();
        assert!(matches!(err, StorageError::JobNotFound { id: 99 }));
        // Collection untouched.
        assert_eq!(store.dead_letter_size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn status_roundtrip_and_missing_id() {
        let store = InMemoryStore::new();
        store.set_status(3, JobStatus::Processing).await.unwrap();
        assert_eq!(
            store.get_status(3).await.unwrap(),
            JobStatus::Processing
        );
        assert!(matches!(
            store.get_status(4).await.unwrap_err(),
            StorageError::JobNotFound { id: 4 }
        ));
    }

    #[tokio::test]
    async fn terminal_records_land_in_history_newest_first() {
        let store = InMemoryStore::new();

        let mut a = job(1);
        a.status = JobStatus::Success;
        let mut b = job(2);
        b.status = JobStatus::Failed;
        let c = job(3); // still QUEUED, must not enter history

        store.save_record(&a).await.unwrap();
        store.save_record(&b).await.unwrap();
        store.save_record(&c).await.unwrap();

        let recent = store.list_recent(10).await.unwrap();
        assert_eq!(recent.iter().map(|j| j.id).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[tokio::test]
    async fn list_recent_skips_malformed_records() {
        let store = InMemoryStore::new();

        let mut ok = job(1);
        ok.status = JobStatus::Success;
        store.save_record(&ok).await.unwrap();

        // Corrupt a stored document behind the trait's back.
        {
            let mut state = store.state.lock().unwrap();
            state.records.insert(2, "{broken".to_string());
            state.history.insert(0, 2);
        }

        let recent = store.list_recent(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, 1);
    }

    #[tokio::test]
    async fn delete_record_erases_all_traces() {
        let store = InMemoryStore::new();
        let mut j = job(8);
        j.status = JobStatus::Failed;
        store.save_record(&j).await.unwrap();
        store.set_status(8, JobStatus::Failed).await.unwrap();

        store.delete_record(8).await.unwrap();
        assert!(store.list_recent(10).await.unwrap().is_empty());
        assert!(store.get_status(8).await.is_err());
    }
}
