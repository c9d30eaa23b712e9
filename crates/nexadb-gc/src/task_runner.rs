use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nexadb_core::{CoreError, CoreResult};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::job::{Task, TaskResult};
use crate::state::SegmentState;

/// Deletes the storage object backing a segment.
///
/// Supplied by the storage layer; the pipeline only requires that a
/// successful return means the object is gone (or already was).
#[async_trait]
pub trait Cleaner: Send + Sync {
    async fn clean_up(&self, segment: &SegmentState) -> CoreResult<()>;
}

/// Cleaner that deletes nothing. Stands in until the object-store wiring
/// is configured, and keeps tests free of storage dependencies.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCleaner;

#[async_trait]
impl Cleaner for NoopCleaner {
    async fn clean_up(&self, segment: &SegmentState) -> CoreResult<()> {
        debug!(segment_id = %segment.segment_id, "noop cleanup");
        Ok(())
    }
}

/// Executes tasks as independent units of concurrency.
pub trait TaskRunner: Send + Sync {
    /// Schedules `task` for execution and returns immediately without
    /// waiting for completion. Exactly one result is published on
    /// `results` per call, in completion order.
    fn execute(&self, task: Task, results: mpsc::Sender<TaskResult>);
}

/// Task runner that spawns one tokio task per GC task.
///
/// With a deadline configured, a task that overruns it publishes a
/// result carrying its untouched states and a task-level error, so the
/// job's join count is unaffected and the segments retry next cycle.
pub struct TokioTaskRunner {
    cleaner: Arc<dyn Cleaner>,
    task_timeout: Option<Duration>,
}

impl TokioTaskRunner {
    #[must_use]
    pub fn new(cleaner: Arc<dyn Cleaner>) -> Self {
        Self {
            cleaner,
            task_timeout: None,
        }
    }

    /// Sets a per-task deadline.
    #[must_use]
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = Some(timeout);
        self
    }
}

impl TaskRunner for TokioTaskRunner {
    fn execute(&self, task: Task, results: mpsc::Sender<TaskResult>) {
        let cleaner = Arc::clone(&self.cleaner);
        let task_timeout = self.task_timeout;
        tokio::spawn(async move {
            let task_id = task.id;
            debug!(task_id = %task_id, collections = task.states.len(), "executing task");
            let result = match task_timeout {
                Some(deadline) => {
                    let untouched = task.states.clone();
                    match tokio::time::timeout(deadline, task.run(cleaner.as_ref())).await {
                        Ok(result) => result,
                        Err(_) => {
                            warn!(task_id = %task_id, ?deadline, "task exceeded deadline");
                            TaskResult {
                                id: task_id,
                                states: untouched,
                                error: Some(CoreError::deadline_exceeded(format!(
                                    "task {task_id} did not finish within {deadline:?}"
                                ))),
                            }
                        }
                    }
                }
                None => task.run(cleaner.as_ref()).await,
            };
            if results.send(result).await.is_err() {
                warn!(task_id = %task_id, "result receiver dropped before task reported");
            }
        });
    }
}
