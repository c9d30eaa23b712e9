//! Garbage-collection orchestration for the NexaDB metadata coordinator.
//!
//! Segments dropped from a collection are not deleted inline; the catalog
//! marks them `Dropping` and this pipeline converges them to `Dropped`:
//!
//! ```text
//! GcProcessor (timer)
//!     → InputStore::input            collections with pending segments
//!     → Scheduler::schedule          hash-partition into Tasks
//!     → JobRunner::run
//!         → TaskRunner::execute      one tokio task per GC Task
//!             → Cleaner::clean_up    per Dropping segment
//!         ← mpsc result channel      exactly one TaskResult per Task
//!         → JobStateStore            bookkeeping (non-fatal)
//!         → OutputStore::output      atomic commit of Dropped transitions
//! ```
//!
//! Failures are recovered at the narrowest scope: a failed segment cleanup
//! stays `Dropping` and is re-surfaced by the input store on the next
//! cycle, so deletion is eventually consistent rather than exactly-once.
//! The pipeline assumes a single active coordinator; leader election is
//! the host process's concern.

pub mod job;
pub mod job_runner;
pub mod partition;
pub mod processor;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod task_runner;

pub use job::{Job, Task, TaskResult};
pub use job_runner::JobRunner;
pub use partition::{HashPartitioner, Partitioner};
pub use processor::GcProcessor;
pub use scheduler::{HashScheduler, Scheduler};
pub use state::{CollectionState, SegmentState, SegmentStatus};
pub use store::{
    InputStore, JobRecord, JobStateStore, MemoryStateStore, OutputStore, TaskSummary,
};
pub use task_runner::{Cleaner, NoopCleaner, TaskRunner, TokioTaskRunner};
