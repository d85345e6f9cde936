//! Bounded-concurrency task runner.
//!
//! A fixed pool of `min(concurrency, tasks.len())` workers claims task indices
//! from a shared atomic cursor. Workers are futures polled on the caller's
//! task, so a run needs no spawning and tasks may borrow from the caller.

mod cancel;
mod config;
mod error;
pub mod events;
pub mod metrics;
mod result;
mod worker;

use std::future::Future;
use std::sync::Arc;

use futures_util::future::try_join_all;
use uuid::Uuid;

pub use cancel::sleep_or_cancel;
pub use config::{ProgressFn, RunConfig};
pub use error::{RunError, TaskError, TaskErrorKind};
pub use events::{CompositeEventSink, EventSink, NoOpEventSink, RunEvent, StderrEventSink};
pub use metrics::{MetricsCollector, MetricsEventSink, RunMetrics};
pub use result::{RunResult, TaskFailure, TaskOutcome};
pub use tokio_util::sync::CancellationToken;

use worker::{run_worker, RunContext};

pub struct TaskRunner {
    config: RunConfig,
    event_sink: Arc<dyn EventSink>,
}

impl TaskRunner {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run every task and collect outcomes by task position.
    ///
    /// Per-task failures are returned as data in [`RunResult`]. The call itself
    /// fails only for an invalid configuration or on cancellation, in which
    /// case no partial result is returned.
    pub async fn run<T, F, Fut>(&self, tasks: &[F]) -> Result<RunResult<T>, RunError>
    where
        F: Fn() -> Fut + Sync,
        Fut: Future<Output = TaskOutcome<T>> + Send,
        T: Send,
    {
        self.config.validate()?;

        let cancel = match &self.config.cancel {
            Some(token) => token.child_token(),
            None => CancellationToken::new(),
        };
        if cancel.is_cancelled() {
            return Err(RunError::Cancelled);
        }

        let total = tasks.len();
        if total == 0 {
            return Ok(RunResult::empty());
        }

        let run_id = Uuid::new_v4();
        let workers = self.config.concurrency.min(total);
        let ctx = RunContext::new(
            run_id,
            tasks,
            &self.config.retry,
            cancel,
            self.config.on_progress.as_ref(),
            self.event_sink.as_ref(),
        );

        tracing::info!(%run_id, total, workers, "starting run");
        self.event_sink
            .emit(RunEvent::RunStarted {
                run_id,
                total,
                workers,
            })
            .await;

        let per_worker = match try_join_all((0..workers).map(|id| run_worker(&ctx, id))).await {
            Ok(v) => v,
            Err(e) => {
                let completed = ctx.completed();
                tracing::info!(%run_id, completed, total, "run cancelled");
                self.event_sink
                    .emit(RunEvent::RunCancelled { run_id, completed })
                    .await;
                return Err(e);
            }
        };

        let mut slots: Vec<Option<TaskOutcome<T>>> = (0..total).map(|_| None).collect();
        let mut errors = Vec::new();
        for settled in per_worker.into_iter().flatten() {
            if let Err(e) = &settled.outcome {
                errors.push(TaskFailure {
                    index: settled.index,
                    error: e.clone(),
                });
            }
            slots[settled.index] = Some(settled.outcome);
        }
        let results: Vec<TaskOutcome<T>> = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    panic!("task {index} finished without an outcome. This is a bug - please report it.")
                })
            })
            .collect();

        let completed = ctx.completed();
        tracing::info!(%run_id, completed, failed = errors.len(), "run finished");
        self.event_sink
            .emit(RunEvent::RunFinished {
                run_id,
                completed,
                failed: errors.len(),
            })
            .await;

        Ok(RunResult {
            results,
            completed,
            total,
            errors,
        })
    }
}

/// Run `tasks` with `config` and no event sink.
pub async fn run<T, F, Fut>(tasks: &[F], config: RunConfig) -> Result<RunResult<T>, RunError>
where
    F: Fn() -> Fut + Sync,
    Fut: Future<Output = TaskOutcome<T>> + Send,
    T: Send,
{
    TaskRunner::new(config).run(tasks).await
}
