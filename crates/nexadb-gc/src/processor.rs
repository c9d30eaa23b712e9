use std::sync::Arc;

use nexadb_core::{CoreError, CoreResult, GcConfig};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::job::Job;
use crate::job_runner::JobRunner;
use crate::scheduler::{HashScheduler, Scheduler};
use crate::store::{InputStore, JobStateStore, OutputStore};
use crate::task_runner::{Cleaner, TokioTaskRunner};

/// Timer-driven garbage-collection driver.
///
/// Each tick pulls pending state from the input store, builds a job,
/// schedules it, and runs it to completion before the next tick is
/// observed — cycles never overlap, so the output store sees no
/// job-level concurrency. Assumes it is the single active orchestrator;
/// leader election is guaranteed externally.
pub struct GcProcessor {
    config: GcConfig,
    input_store: Arc<dyn InputStore>,
    scheduler: Arc<dyn Scheduler>,
    job_runner: Arc<JobRunner>,
    worker: Option<JoinHandle<()>>,
    shutdown: Option<watch::Sender<bool>>,
}

impl GcProcessor {
    /// Creates a processor.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(
        config: GcConfig,
        input_store: Arc<dyn InputStore>,
        scheduler: Arc<dyn Scheduler>,
        job_runner: Arc<JobRunner>,
    ) -> CoreResult<Self> {
        config
            .validate()
            .map_err(|err| CoreError::invalid_state(err.to_string()))?;
        Ok(Self {
            config,
            input_store,
            scheduler,
            job_runner,
            worker: None,
            shutdown: None,
        })
    }

    /// Wires the standard pipeline around `cleaner`: a [`TokioTaskRunner`]
    /// built from `config` (including the per-task deadline, when set), a
    /// hash scheduler, and a [`JobRunner`] over the given stores.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn with_cleaner(
        config: GcConfig,
        input_store: Arc<dyn InputStore>,
        job_store: Arc<dyn JobStateStore>,
        output_store: Arc<dyn OutputStore>,
        cleaner: Arc<dyn Cleaner>,
    ) -> CoreResult<Self> {
        let mut task_runner = TokioTaskRunner::new(cleaner);
        if let Some(timeout) = config.task_timeout() {
            task_runner = task_runner.with_task_timeout(timeout);
        }
        let job_runner = Arc::new(JobRunner::new(
            Arc::new(task_runner),
            job_store,
            output_store,
        ));
        Self::new(
            config,
            input_store,
            Arc::new(HashScheduler::default()),
            job_runner,
        )
    }

    /// Starts the background cycle loop.
    pub fn start(&mut self) {
        if self.worker.is_some() {
            warn!("gc processor already running");
            return;
        }

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let inner = self.clone_for_worker();
        let interval = self.config.interval();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of `interval` fires immediately; consume it
            // so the first cycle happens one full interval after start.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        info!("gc processor stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(err) = inner.run_cycle().await {
                            error!(error = %err, "gc cycle failed");
                        }
                    }
                }
            }
        });

        self.worker = Some(handle);
        self.shutdown = Some(shutdown_tx);
        info!(
            interval_secs = self.config.interval_secs,
            parallelism = self.config.parallelism,
            "gc processor started"
        );
    }

    /// Signals the loop to exit and waits for it to finish.
    ///
    /// Does not preempt an in-flight cycle: the current job runs to
    /// completion, then the loop exits and the worker is reaped, so no
    /// background execution outlives this call.
    pub async fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(worker) = self.worker.take() {
            if let Err(err) = worker.await {
                error!(error = %err, "gc worker ended abnormally");
            }
        }
        info!("gc processor stopped");
    }

    /// Runs one garbage-collection cycle.
    ///
    /// Called by the background loop; can also be invoked directly, e.g.
    /// from tests or an admin trigger.
    ///
    /// # Errors
    ///
    /// Returns scheduling and output-commit errors. An input-store
    /// failure only skips the cycle: the next tick retries naturally.
    pub async fn run_cycle(&self) -> CoreResult<()> {
        let states = match self.input_store.input().await {
            Ok(states) => states,
            Err(err) => {
                warn!(error = %err, "input store unavailable; skipping gc cycle");
                return Ok(());
            }
        };
        if states.is_empty() {
            debug!("no segments pending deletion");
            return Ok(());
        }

        let mut job = Job::new(states, self.config.parallelism);
        let job_id = job.id;
        self.scheduler.schedule(&mut job)?;
        debug!(job_id = %job_id, tasks = job.tasks.len(), "gc job scheduled");
        self.job_runner.run(job).await
    }

    /// Clone for the worker loop (without handle and shutdown signal).
    fn clone_for_worker(&self) -> Self {
        Self {
            config: self.config.clone(),
            input_store: Arc::clone(&self.input_store),
            scheduler: Arc::clone(&self.scheduler),
            job_runner: Arc::clone(&self.job_runner),
            worker: None,
            shutdown: None,
        }
    }
}
