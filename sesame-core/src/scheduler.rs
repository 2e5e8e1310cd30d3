//! Deferred job scheduling.
//!
//! The lockout service schedules the release of a lock to run after the
//! block time. The [`Scheduler`] trait keeps that mechanism injectable:
//! the default [`TokioScheduler`] uses in-process timers, but a host
//! application can substitute a durable queue.
//!
//! Delivery is at-least-once at best; scheduled jobs must re-validate
//! their preconditions when they fire, and callers must tolerate jobs
//! that never fire (e.g. after a process restart).

use crate::Error;
use dashmap::DashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

pub type ScheduledJob = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

pub trait Scheduler: Send + Sync {
    /// Schedule `job` to run once after `delay`. Scheduling again under the
    /// same key replaces the pending job.
    fn schedule_once(&self, key: &str, delay: Duration, job: ScheduledJob) -> Result<(), Error>;

    /// Cancel the pending job under `key`. Returns whether one was pending.
    fn cancel(&self, key: &str) -> bool;
}

/// In-process scheduler backed by tokio timers.
///
/// Pending jobs do not survive a process restart.
#[derive(Default)]
pub struct TokioScheduler {
    pending: Arc<DashMap<String, tokio::task::JoinHandle<()>>>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of jobs currently tracked. Completed jobs linger until their
    /// key is rescheduled or cancelled.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_once(&self, key: &str, delay: Duration, job: ScheduledJob) -> Result<(), Error> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Schedule(format!("No tokio runtime available: {e}")))?;

        if let Some((_, old)) = self.pending.remove(key) {
            old.abort();
        }

        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            job.await;
        });

        self.pending.insert(key.to_string(), handle);
        Ok(())
    }

    fn cancel(&self, key: &str) -> bool {
        match self.pending.remove(key) {
            Some((_, handle)) => {
                let was_pending = !handle.is_finished();
                handle.abort();
                was_pending
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_job(counter: Arc<AtomicU32>) -> ScheduledJob {
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn test_scheduled_job_fires() {
        let scheduler = TokioScheduler::new();
        let counter = Arc::new(AtomicU32::new(0));

        scheduler
            .schedule_once("job", Duration::from_millis(10), counting_job(counter.clone()))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_prevents_firing() {
        let scheduler = TokioScheduler::new();
        let counter = Arc::new(AtomicU32::new(0));

        scheduler
            .schedule_once("job", Duration::from_millis(50), counting_job(counter.clone()))
            .unwrap();
        assert!(scheduler.cancel("job"));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(!scheduler.cancel("job"));
    }

    #[tokio::test]
    async fn test_reschedule_replaces_pending_job() {
        let scheduler = TokioScheduler::new();
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));

        scheduler
            .schedule_once("job", Duration::from_millis(50), counting_job(first.clone()))
            .unwrap();
        scheduler
            .schedule_once("job", Duration::from_millis(10), counting_job(second.clone()))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending_count(), 1);
    }
}
