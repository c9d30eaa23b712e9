use nexadb_core::{CoreError, JobId, TaskId};
use tracing::{debug, warn};

use crate::state::{CollectionState, SegmentStatus};
use crate::task_runner::Cleaner;

/// One full garbage-collection cycle.
///
/// Created by the driver at each tick, populated with tasks by the
/// scheduler, consumed exactly once by the job runner. Its outcome lives
/// on in the job state store and output store, not in the job itself.
#[derive(Debug)]
pub struct Job {
    pub id: JobId,
    /// Scheduling input for this cycle.
    pub states: Vec<CollectionState>,
    /// Filled in by the scheduler; immutable afterwards.
    pub tasks: Vec<Task>,
    /// Number of concurrent workers, and therefore tasks, for this cycle.
    pub parallelism: usize,
}

impl Job {
    #[must_use]
    pub fn new(states: Vec<CollectionState>, parallelism: usize) -> Self {
        Self {
            id: JobId::new(),
            states,
            tasks: Vec::new(),
            parallelism,
        }
    }

    /// Whether the scheduler has already attached tasks.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        !self.tasks.is_empty()
    }
}

/// One partition's worth of work within a job.
///
/// Owned exclusively by its job; its collection states alias nothing
/// outside the task, so mutation during execution is race-free.
#[derive(Debug)]
pub struct Task {
    pub id: TaskId,
    pub states: Vec<CollectionState>,
}

impl Task {
    #[must_use]
    pub fn new(states: Vec<CollectionState>) -> Self {
        Self {
            id: TaskId::new(),
            states,
        }
    }

    /// Attempts cleanup for every pending segment in this task.
    ///
    /// Successful cleanups flip the segment to `Dropped` in the task's
    /// local copy; a failed cleanup leaves the segment `Dropping` and
    /// processing continues, so one bad segment never aborts the task.
    /// Always produces exactly one result.
    pub async fn run(mut self, cleaner: &dyn Cleaner) -> TaskResult {
        for state in &mut self.states {
            for segment in state.segments.values_mut() {
                if segment.status != SegmentStatus::Dropping {
                    continue;
                }
                match cleaner.clean_up(segment).await {
                    Ok(()) => {
                        debug!(
                            collection_id = %state.collection_id,
                            segment_id = %segment.segment_id,
                            "segment cleaned up"
                        );
                        segment.status = SegmentStatus::Dropped;
                    }
                    Err(err) => {
                        warn!(
                            collection_id = %state.collection_id,
                            segment_id = %segment.segment_id,
                            error = %err,
                            "segment cleanup failed; will retry next cycle"
                        );
                    }
                }
            }
        }
        TaskResult {
            id: self.id,
            states: self.states,
            error: None,
        }
    }
}

/// Outcome of one task, published exactly once on the job's result channel.
#[derive(Debug)]
pub struct TaskResult {
    pub id: TaskId,
    /// The task's collection states with updated segment statuses.
    pub states: Vec<CollectionState>,
    /// Set only when the task could not run at all (e.g. deadline
    /// exceeded), never for per-segment cleanup failures.
    pub error: Option<CoreError>,
}

impl TaskResult {
    /// Number of segments this task transitioned to `Dropped`.
    #[must_use]
    pub fn dropped_count(&self) -> usize {
        self.count_with_status(SegmentStatus::Dropped)
    }

    /// Number of segments still pending after this task ran.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.count_with_status(SegmentStatus::Dropping)
    }

    fn count_with_status(&self, status: SegmentStatus) -> usize {
        self.states
            .iter()
            .flat_map(|state| state.segments.values())
            .filter(|segment| segment.status == status)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SegmentState;
    use async_trait::async_trait;
    use nexadb_core::CoreResult;
    use parking_lot::Mutex;
    use std::collections::HashSet;

    struct RecordingCleaner {
        calls: Mutex<Vec<String>>,
        fail_segments: HashSet<String>,
    }

    impl RecordingCleaner {
        fn new(fail_segments: &[&str]) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_segments: fail_segments.iter().map(ToString::to_string).collect(),
            }
        }
    }

    #[async_trait]
    impl Cleaner for RecordingCleaner {
        async fn clean_up(&self, segment: &SegmentState) -> CoreResult<()> {
            self.calls.lock().push(segment.segment_id.clone());
            if self.fail_segments.contains(&segment.segment_id) {
                return Err(CoreError::StorageError(format!(
                    "object for {} unavailable",
                    segment.segment_id
                )));
            }
            Ok(())
        }
    }

    fn task_with_segments(segments: &[&str]) -> Task {
        let mut state = CollectionState::new("c1");
        for id in segments {
            state.insert_segment(SegmentState::dropping(*id, None));
        }
        Task::new(vec![state])
    }

    #[tokio::test]
    async fn run_drops_every_pending_segment() {
        let cleaner = RecordingCleaner::new(&[]);
        let task = task_with_segments(&["s1", "s2"]);
        let result = task.run(&cleaner).await;

        assert!(result.error.is_none());
        assert_eq!(result.dropped_count(), 2);
        assert_eq!(result.pending_count(), 0);
        assert_eq!(cleaner.calls.lock().len(), 2);
    }

    #[tokio::test]
    async fn failed_cleanup_leaves_segment_pending_and_continues() {
        let cleaner = RecordingCleaner::new(&["s1"]);
        let task = task_with_segments(&["s1", "s2"]);
        let result = task.run(&cleaner).await;

        assert!(result.error.is_none());
        assert_eq!(result.pending_count(), 1);
        assert_eq!(result.dropped_count(), 1);
        // Both segments were still attempted.
        assert_eq!(cleaner.calls.lock().len(), 2);

        let state = &result.states[0];
        assert_eq!(state.segments["s1"].status, SegmentStatus::Dropping);
        assert_eq!(state.segments["s2"].status, SegmentStatus::Dropped);
    }

    #[tokio::test]
    async fn already_dropped_segments_are_not_cleaned_again() {
        let cleaner = RecordingCleaner::new(&[]);
        let mut state = CollectionState::new("c1");
        state.insert_segment(SegmentState::dropping("s1", None));
        state.insert_segment(SegmentState {
            segment_id: "s2".to_string(),
            path: None,
            status: SegmentStatus::Dropped,
        });
        let result = Task::new(vec![state]).run(&cleaner).await;

        assert_eq!(*cleaner.calls.lock(), ["s1"]);
        assert_eq!(result.dropped_count(), 2);
    }
}
