//! # Bounded-parallelism job queue.
//!
//! [`Queue`] runs a list of jobs with at most `max_concurrency` in flight. Jobs are
//! started in FIFO order as permits free up; each one runs as its own tokio task.
//!
//! ```text
//! process()
//!   for job in jobs (FIFO):
//!     acquire permit ──► spawn(job) on JoinSet   (permit dropped when job returns)
//!   join all ──► QueueOutcome { results[i] for jobs[i] }
//! ```
//!
//! ## Rules
//! - `max_concurrency` is clamped to at least 1.
//! - Every job is attempted; a panicking job is reported as [`JobError::Panicked`]
//!   and never cancels the others.
//! - Results are listed in job order, not completion order.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::trace;

use crate::error::JobError;
use crate::node::panic_message;

/// A deferred unit of work.
pub type Job<T> = Box<dyn FnOnce() -> BoxFuture<'static, T> + Send>;

/// Wraps an async closure into a [`Job`].
pub fn job<T, F, Fut>(f: F) -> Job<T>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
{
    Box::new(move || f().boxed())
}

/// Per-job results of [`Queue::process`], in job order.
#[derive(Debug)]
pub struct QueueOutcome<T> {
    pub results: Vec<Result<T, JobError>>,
}

impl<T> QueueOutcome<T> {
    /// Number of jobs that did not return.
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.is_err()).count()
    }

    /// True if every job returned.
    pub fn is_ok(&self) -> bool {
        self.failed() == 0
    }
}

/// Jobs waiting to be processed with bounded parallelism.
pub struct Queue<T> {
    jobs: Vec<Job<T>>,
    max_concurrency: usize,
}

impl<T: Send + 'static> Queue<T> {
    pub fn new(jobs: Vec<Job<T>>, max_concurrency: usize) -> Self {
        Self {
            jobs,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Number of queued jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Runs every job and waits for all of them.
    pub async fn process(self) -> QueueOutcome<T> {
        let total = self.jobs.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut set = JoinSet::new();

        for (idx, job) in self.jobs.into_iter().enumerate() {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            trace!(job = idx, total, "job scheduled");
            set.spawn(async move {
                let _permit = permit;
                let out = AssertUnwindSafe(async move { job().await })
                    .catch_unwind()
                    .await;
                (idx, out)
            });
        }

        let mut slots: Vec<Option<Result<T, JobError>>> = (0..total).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, Ok(value))) => slots[idx] = Some(Ok(value)),
                Ok((idx, Err(payload))) => {
                    let message = panic_message(payload.as_ref());
                    trace!(job = idx, %message, "job panicked");
                    slots[idx] = Some(Err(JobError::Panicked { message }));
                }
                Err(err) => trace!(error = %err, "job task aborted"),
            }
        }

        QueueOutcome {
            results: slots
                .into_iter()
                .map(|slot| slot.unwrap_or(Err(JobError::Aborted)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn never_exceeds_the_bound() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let jobs = (0..8)
            .map(|_| {
                let running = running.clone();
                let peak = peak.clone();
                job(move || async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        let outcome = Queue::new(jobs, 3).process().await;
        assert!(outcome.is_ok());
        assert_eq!(outcome.results.len(), 8);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn starts_in_fifo_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let jobs = (0..5)
            .map(|i| {
                let order = order.clone();
                job(move || async move {
                    order.lock().unwrap().push(i);
                    tokio::task::yield_now().await;
                    i * 10
                })
            })
            .collect();

        let outcome = Queue::new(jobs, 1).process().await;
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        let values: Vec<_> = outcome.results.into_iter().map(Result::unwrap).collect();
        assert_eq!(values, vec![0, 10, 20, 30, 40]);
    }

    #[tokio::test]
    async fn panics_do_not_stop_other_jobs() {
        let jobs: Vec<Job<u8>> = vec![
            job(|| async { 1 }),
            job(|| async {
                if true {
                    panic!("bad job");
                }
                2
            }),
            job(|| async { 3 }),
        ];
        let outcome = Queue::new(jobs, 0).process().await;
        assert_eq!(outcome.failed(), 1);
        assert_eq!(outcome.results[0], Ok(1));
        assert_eq!(
            outcome.results[1],
            Err(JobError::Panicked { message: "bad job".into() })
        );
        assert_eq!(outcome.results[2], Ok(3));
    }

    #[tokio::test]
    async fn empty_queue_completes() {
        let outcome = Queue::<()>::new(Vec::new(), 4).process().await;
        assert!(outcome.is_ok());
        assert!(outcome.results.is_empty());
    }
}
