use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nexadb_core::{CoreError, CoreResult, JobId, TaskId};
use parking_lot::RwLock;
use tracing::debug;

use crate::job::{Job, TaskResult};
use crate::state::{CollectionState, SegmentStatus};

/// Source of scheduling input for each cycle.
#[async_trait]
pub trait InputStore: Send + Sync {
    /// Returns the collections having at least one segment pending
    /// deletion. Nothing pending is an empty vec, never an error.
    async fn input(&self) -> CoreResult<Vec<CollectionState>>;
}

/// Durable sink for completed task results.
#[async_trait]
pub trait OutputStore: Send + Sync {
    /// Commits every `Dropped` transition in `result` to the catalog.
    /// The commit is atomic per result: all transitions apply, or none.
    async fn output(&self, result: &TaskResult) -> CoreResult<()>;
}

/// Job/task lifecycle bookkeeping for observability and crash diagnosis.
///
/// Failures here are logged by the caller and never abort an in-flight job.
#[async_trait]
pub trait JobStateStore: Send + Sync {
    /// Records a new job. Recording the same job id twice must not
    /// duplicate state.
    async fn add_job(&self, job: &Job) -> CoreResult<()>;

    /// Records the outcome of one task belonging to `job_id`.
    async fn update_state(&self, job_id: JobId, result: &TaskResult) -> CoreResult<()>;
}

/// Bookkeeping summary of one task outcome.
#[derive(Debug, Clone)]
pub struct TaskSummary {
    pub task_id: TaskId,
    pub dropped: usize,
    pub pending: usize,
    pub error: Option<String>,
}

/// Lifecycle record of one job.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub job_id: JobId,
    pub task_ids: Vec<TaskId>,
    pub created_at: DateTime<Utc>,
    pub results: HashMap<TaskId, TaskSummary>,
}

#[derive(Default)]
struct StoreInner {
    states: HashMap<String, CollectionState>,
    jobs: HashMap<JobId, JobRecord>,
}

/// In-memory backend implementing all three store seams.
///
/// Used by tests and single-node deployments. The database-backed
/// catalog implements the same traits; which variant a processor talks
/// to is decided at construction time.
#[derive(Default)]
pub struct MemoryStateStore {
    inner: RwLock<StoreInner>,
}

impl MemoryStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds or merges collection state. Segments of an existing
    /// collection are unioned by segment id, newest entry winning.
    pub fn add_state(&self, state: CollectionState) {
        let mut inner = self.inner.write();
        match inner.states.get_mut(&state.collection_id) {
            Some(existing) => {
                for (segment_id, segment) in state.segments {
                    existing.segments.insert(segment_id, segment);
                }
            }
            None => {
                inner.states.insert(state.collection_id.clone(), state);
            }
        }
    }

    /// Current status of a segment, if known.
    #[must_use]
    pub fn segment_status(&self, collection_id: &str, segment_id: &str) -> Option<SegmentStatus> {
        let inner = self.inner.read();
        inner
            .states
            .get(collection_id)
            .and_then(|state| state.segments.get(segment_id))
            .map(|segment| segment.status)
    }

    /// Bookkeeping record for one job, if recorded.
    #[must_use]
    pub fn job_record(&self, job_id: JobId) -> Option<JobRecord> {
        self.inner.read().jobs.get(&job_id).cloned()
    }

    /// All job records, unordered.
    #[must_use]
    pub fn job_records(&self) -> Vec<JobRecord> {
        self.inner.read().jobs.values().cloned().collect()
    }
}

#[async_trait]
impl InputStore for MemoryStateStore {
    async fn input(&self) -> CoreResult<Vec<CollectionState>> {
        let inner = self.inner.read();
        let mut pending = Vec::new();
        for state in inner.states.values() {
            let segments: HashMap<_, _> = state
                .segments
                .iter()
                .filter(|(_, segment)| segment.status == SegmentStatus::Dropping)
                .map(|(id, segment)| (id.clone(), segment.clone()))
                .collect();
            if !segments.is_empty() {
                pending.push(CollectionState {
                    collection_id: state.collection_id.clone(),
                    segments,
                });
            }
        }
        Ok(pending)
    }
}

#[async_trait]
impl OutputStore for MemoryStateStore {
    async fn output(&self, result: &TaskResult) -> CoreResult<()> {
        // One write lock for the whole result keeps the commit atomic.
        let mut inner = self.inner.write();
        for state in &result.states {
            let Some(stored) = inner.states.get_mut(&state.collection_id) else {
                continue;
            };
            for segment in state.segments.values() {
                if segment.status != SegmentStatus::Dropped {
                    continue;
                }
                if let Some(known) = stored.segments.get_mut(&segment.segment_id) {
                    known.status = SegmentStatus::Dropped;
                }
            }
        }
        debug!(task_id = %result.id, dropped = result.dropped_count(), "task result committed");
        Ok(())
    }
}

#[async_trait]
impl JobStateStore for MemoryStateStore {
    async fn add_job(&self, job: &Job) -> CoreResult<()> {
        let mut inner = self.inner.write();
        inner.jobs.entry(job.id).or_insert_with(|| JobRecord {
            job_id: job.id,
            task_ids: job.tasks.iter().map(|task| task.id).collect(),
            created_at: Utc::now(),
            results: HashMap::new(),
        });
        Ok(())
    }

    async fn update_state(&self, job_id: JobId, result: &TaskResult) -> CoreResult<()> {
        let mut inner = self.inner.write();
        let record = inner
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| CoreError::not_found("job", job_id.to_string()))?;
        record.results.insert(
            result.id,
            TaskSummary {
                task_id: result.id,
                dropped: result.dropped_count(),
                pending: result.pending_count(),
                error: result.error.as_ref().map(ToString::to_string),
            },
        );
        Ok(())
    }
}
