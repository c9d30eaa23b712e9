use std::sync::Arc;

use nexadb_core::{CoreError, CoreResult};
use tracing::debug;

use crate::job::{Job, Task};
use crate::partition::{HashPartitioner, Partitioner};

/// Turns a job's scheduling input into executable tasks.
pub trait Scheduler: Send + Sync {
    /// Attaches exactly `job.parallelism` tasks to `job`, covering every
    /// collection in `job.states` exactly once. Tasks may be empty so the
    /// runner's result bookkeeping stays consistent.
    ///
    /// # Errors
    ///
    /// Fails if the job was already scheduled or the partitioner rejects
    /// the partition count.
    fn schedule(&self, job: &mut Job) -> CoreResult<()>;
}

/// Scheduler that delegates bucket assignment to a [`Partitioner`].
pub struct HashScheduler {
    partitioner: Arc<dyn Partitioner>,
}

impl HashScheduler {
    #[must_use]
    pub fn new(partitioner: Arc<dyn Partitioner>) -> Self {
        Self { partitioner }
    }
}

impl Default for HashScheduler {
    fn default() -> Self {
        Self::new(Arc::new(HashPartitioner::new()))
    }
}

impl Scheduler for HashScheduler {
    fn schedule(&self, job: &mut Job) -> CoreResult<()> {
        if job.is_scheduled() {
            return Err(CoreError::invalid_state(format!(
                "job {} is already scheduled",
                job.id
            )));
        }
        let buckets = self.partitioner.partition(&job.states, job.parallelism)?;
        job.tasks = buckets.into_iter().map(Task::new).collect();
        for task in &job.tasks {
            debug!(
                job_id = %job.id,
                task_id = %task.id,
                collections = task.states.len(),
                "task scheduled"
            );
        }
        Ok(())
    }
}
