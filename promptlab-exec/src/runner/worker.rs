use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::retry::{decide_retry, RetryConfig, RetryDecision};
use crate::runner::cancel::sleep_or_cancel;
use crate::runner::config::ProgressFn;
use crate::runner::error::{panic_message, RunError, TaskError};
use crate::runner::events::{EventSink, RunEvent};
use crate::runner::result::{Settled, TaskOutcome};

/// State shared by the workers of one run. Lives only for that run.
pub(crate) struct RunContext<'a, F> {
    pub run_id: Uuid,
    pub tasks: &'a [F],
    pub retry: &'a RetryConfig,
    pub cancel: CancellationToken,
    pub on_progress: Option<&'a ProgressFn>,
    pub event_sink: &'a dyn EventSink,
    cursor: AtomicUsize,
    completed: AtomicUsize,
}

impl<'a, F> RunContext<'a, F> {
    pub fn new(
        run_id: Uuid,
        tasks: &'a [F],
        retry: &'a RetryConfig,
        cancel: CancellationToken,
        on_progress: Option<&'a ProgressFn>,
        event_sink: &'a dyn EventSink,
    ) -> Self {
        Self {
            run_id,
            tasks,
            retry,
            cancel,
            on_progress,
            event_sink,
            cursor: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    /// Next unclaimed index. Each index is handed out exactly once.
    fn claim(&self) -> Option<usize> {
        let index = self.cursor.fetch_add(1, Ordering::AcqRel);
        (index < self.tasks.len()).then_some(index)
    }

    fn report_progress(&self, completed: usize) {
        let Some(cb) = self.on_progress else {
            return;
        };
        let total = self.tasks.len();
        if let Err(payload) = std::panic::catch_unwind(AssertUnwindSafe(|| (**cb)(completed, total))) {
            tracing::warn!(
                run_id = %self.run_id,
                completed,
                total,
                panic = %panic_message(payload.as_ref()),
                "progress callback panicked; ignoring"
            );
        }
    }

    async fn settle<T>(&self, index: usize, attempts: usize, outcome: &TaskOutcome<T>) {
        // Progress is reported before any await so callbacks see `completed`
        // in increasing order.
        let completed = self.completed.fetch_add(1, Ordering::AcqRel) + 1;
        self.report_progress(completed);

        let event = match outcome {
            Ok(_) => RunEvent::TaskSucceeded {
                run_id: self.run_id,
                index,
                attempts,
            },
            Err(e) => RunEvent::TaskFailed {
                run_id: self.run_id,
                index,
                attempts,
                message: e.to_string(),
            },
        };
        self.event_sink.emit(event).await;
    }
}

/// Claim and run tasks until none are left. Returns the outcomes this worker
/// settled, or `Cancelled` as soon as cancellation is observed.
pub(crate) async fn run_worker<T, F, Fut>(
    ctx: &RunContext<'_, F>,
    worker_id: usize,
) -> Result<Vec<Settled<T>>, RunError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = TaskOutcome<T>>,
{
    let mut settled = Vec::new();
    loop {
        if ctx.cancel.is_cancelled() {
            return Err(RunError::Cancelled);
        }
        let Some(index) = ctx.claim() else {
            tracing::debug!(run_id = %ctx.run_id, worker_id, "no tasks left; worker exiting");
            break;
        };
        tracing::debug!(run_id = %ctx.run_id, worker_id, index, "claimed task");

        let (outcome, attempts) = run_task(ctx, index).await?;
        if ctx.cancel.is_cancelled() {
            return Err(RunError::Cancelled);
        }
        ctx.settle(index, attempts, &outcome).await;
        settled.push(Settled { index, outcome });
    }
    Ok(settled)
}

/// Attempt one task until it succeeds, fails for good, or the run is cancelled.
async fn run_task<T, F, Fut>(
    ctx: &RunContext<'_, F>,
    index: usize,
) -> Result<(TaskOutcome<T>, usize), RunError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = TaskOutcome<T>>,
{
    let task = &ctx.tasks[index];
    let mut attempt = 1;
    loop {
        ctx.event_sink
            .emit(RunEvent::TaskStarted {
                run_id: ctx.run_id,
                index,
                attempt,
            })
            .await;

        let result = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return Err(RunError::Cancelled),
            r = invoke(task) => r,
        };

        let err = match result {
            Ok(value) => return Ok((Ok(value), attempt)),
            Err(e) => e,
        };

        if err.is_cancelled() {
            // Stop the sibling workers too; the caller's token is left alone.
            ctx.cancel.cancel();
            return Err(RunError::Cancelled);
        }
        if ctx.cancel.is_cancelled() {
            return Err(RunError::Cancelled);
        }

        match decide_retry(ctx.retry, attempt, &err, fastrand::f64) {
            RetryDecision::RetryAfter { delay, .. } => {
                let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(
                    run_id = %ctx.run_id,
                    index,
                    attempt,
                    delay_ms,
                    error = %err,
                    "task attempt failed; retrying"
                );
                ctx.event_sink
                    .emit(RunEvent::TaskRetryScheduled {
                        run_id: ctx.run_id,
                        index,
                        attempt,
                        delay_ms,
                    })
                    .await;
                if !sleep_or_cancel(&ctx.cancel, delay).await {
                    return Err(RunError::Cancelled);
                }
                attempt += 1;
            }
            RetryDecision::Stop { reason } => {
                tracing::debug!(run_id = %ctx.run_id, index, attempt, ?reason, "task failed for good");
                return Ok((Err(err.with_attempts(attempt)), attempt));
            }
        }
    }
}

/// Run one attempt, turning a panic anywhere in the task into a `TaskError`.
async fn invoke<T, F, Fut>(task: &F) -> TaskOutcome<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = TaskOutcome<T>>,
{
    match AssertUnwindSafe(async { task().await }).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(TaskError::from_panic(payload)),
    }
}
