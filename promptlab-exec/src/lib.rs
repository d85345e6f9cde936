#![forbid(unsafe_code)]

//! Runtime for promptlab batches.
//!
//! [`runner`] executes task thunks under a concurrency cap with retries, backoff
//! and cooperative cancellation. [`job`] turns planned image/model pairs into
//! such thunks.

pub mod job;
pub mod retry;
pub mod runner;

pub use crate::job::{GeneratedPrompt, GenerationClient, HttpClient, HttpError, ReqwestHttpClient};
pub use crate::retry::RetryConfig;
pub use crate::runner::{
    run, sleep_or_cancel, CancellationToken, ProgressFn, RunConfig, RunError, RunResult,
    TaskError, TaskErrorKind, TaskFailure, TaskOutcome, TaskRunner,
};
