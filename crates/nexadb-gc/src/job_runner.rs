use std::sync::Arc;

use nexadb_core::{CoreError, CoreResult};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::job::Job;
use crate::store::{JobStateStore, OutputStore};
use crate::task_runner::TaskRunner;

/// Orchestrates one job end-to-end: records it, fans its tasks out,
/// joins on exactly one result per task, and commits each result.
pub struct JobRunner {
    task_runner: Arc<dyn TaskRunner>,
    job_store: Arc<dyn JobStateStore>,
    output_store: Arc<dyn OutputStore>,
}

impl JobRunner {
    #[must_use]
    pub fn new(
        task_runner: Arc<dyn TaskRunner>,
        job_store: Arc<dyn JobStateStore>,
        output_store: Arc<dyn OutputStore>,
    ) -> Self {
        Self {
            task_runner,
            job_store,
            output_store,
        }
    }

    /// Runs `job` to completion.
    ///
    /// All tasks execute concurrently; this call returns only after every
    /// task has reported. Bookkeeping failures are logged and swallowed.
    /// An output-commit failure becomes the returned error, but draining
    /// of the remaining results continues first — the affected segments
    /// stay `Dropping` and are retried next cycle. Tasks are not retried
    /// here; retry is the driver's policy.
    ///
    /// # Errors
    ///
    /// Returns the first output-commit error, or an internal error if a
    /// worker vanished without reporting.
    pub async fn run(&self, job: Job) -> CoreResult<()> {
        let job_id = job.id;
        let expected = job.tasks.len();
        info!(job_id = %job_id, tasks = expected, "running gc job");

        if let Err(err) = self.job_store.add_job(&job).await {
            warn!(job_id = %job_id, error = %err, "failed to record job; continuing");
        }

        let (tx, mut rx) = mpsc::channel(expected.max(1));
        for task in job.tasks {
            self.task_runner.execute(task, tx.clone());
        }
        drop(tx);

        // The single join point: one receive per task, arrival order free.
        let mut output_err = None;
        for _ in 0..expected {
            let result = rx.recv().await.ok_or_else(|| {
                CoreError::internal("result channel closed before every task reported")
            })?;
            if let Some(err) = &result.error {
                warn!(job_id = %job_id, task_id = %result.id, error = %err, "task failed");
            }
            if let Err(err) = self.job_store.update_state(job_id, &result).await {
                warn!(
                    job_id = %job_id,
                    task_id = %result.id,
                    error = %err,
                    "failed to record task state; continuing"
                );
            }
            if let Err(err) = self.output_store.output(&result).await {
                error!(
                    job_id = %job_id,
                    task_id = %result.id,
                    error = %err,
                    "failed to commit task result; segments stay pending"
                );
                output_err.get_or_insert(err);
            }
        }

        info!(job_id = %job_id, "gc job finished");
        match output_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::TaskResult;
    use crate::scheduler::{HashScheduler, Scheduler};
    use crate::state::{CollectionState, SegmentState};
    use crate::store::MemoryStateStore;
    use crate::task_runner::{NoopCleaner, TokioTaskRunner};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingOutputStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl OutputStore for FailingOutputStore {
        async fn output(&self, _result: &TaskResult) -> CoreResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CoreError::StorageError("catalog unavailable".to_string()))
        }
    }

    fn scheduled_job(collections: &[&str], parallelism: usize) -> Job {
        let states = collections
            .iter()
            .map(|id| {
                CollectionState::new(*id)
                    .with_segment(SegmentState::dropping(format!("{id}-seg"), None))
            })
            .collect();
        let mut job = Job::new(states, parallelism);
        HashScheduler::default().schedule(&mut job).unwrap();
        job
    }

    #[tokio::test]
    async fn run_joins_on_every_task_including_empty_ones() {
        let store = Arc::new(MemoryStateStore::new());
        let runner = JobRunner::new(
            Arc::new(TokioTaskRunner::new(Arc::new(NoopCleaner))),
            store.clone(),
            store.clone(),
        );

        // One collection across three partitions: two tasks are empty.
        let job = scheduled_job(&["c1"], 3);
        let job_id = job.id;
        runner.run(job).await.unwrap();

        let record = store.job_record(job_id).unwrap();
        assert_eq!(record.results.len(), 3);
    }

    #[tokio::test]
    async fn output_failure_is_reported_after_all_results_drain() {
        let bookkeeping = Arc::new(MemoryStateStore::new());
        let output = Arc::new(FailingOutputStore {
            calls: AtomicUsize::new(0),
        });
        let runner = JobRunner::new(
            Arc::new(TokioTaskRunner::new(Arc::new(NoopCleaner))),
            bookkeeping.clone(),
            output.clone(),
        );

        let job = scheduled_job(&["c1", "c2", "c3"], 2);
        let job_id = job.id;
        let err = runner.run(job).await.unwrap_err();
        assert!(matches!(err, CoreError::StorageError(_)));

        // Every result was still drained and offered to the output store.
        assert_eq!(output.calls.load(Ordering::SeqCst), 2);
        assert_eq!(bookkeeping.job_record(job_id).unwrap().results.len(), 2);
    }

    #[tokio::test]
    async fn no_collection_is_lost_across_a_run() {
        let store = Arc::new(MemoryStateStore::new());
        for id in ["c1", "c2", "c3", "c4", "c5"] {
            store.add_state(
                CollectionState::new(id)
                    .with_segment(SegmentState::dropping(format!("{id}-seg"), None)),
            );
        }
        let runner = JobRunner::new(
            Arc::new(TokioTaskRunner::new(Arc::new(NoopCleaner))),
            store.clone(),
            store.clone(),
        );

        let job = scheduled_job(&["c1", "c2", "c3", "c4", "c5"], 3);
        runner.run(job).await.unwrap();

        // Every seeded segment was committed as dropped.
        for id in ["c1", "c2", "c3", "c4", "c5"] {
            assert_eq!(
                store.segment_status(id, &format!("{id}-seg")),
                Some(crate::state::SegmentStatus::Dropped)
            );
        }
    }
}
