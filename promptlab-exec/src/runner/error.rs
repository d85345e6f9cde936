use std::any::Any;
use std::fmt;

/// Failures of a whole run. Per-task failures never surface here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("run cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskErrorKind {
    /// Transient failure, retried while attempts remain.
    Failed,
    /// The task gave up waiting on its own work; retried like `Failed`.
    Timeout,
    /// The task panicked. The payload is kept as the message.
    Panicked,
    /// Retrying cannot help (bad input, rejected request).
    Permanent,
    /// The task observed cancellation. Aborts the whole run.
    Cancelled,
}

impl fmt::Display for TaskErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskErrorKind::Failed => "failed",
            TaskErrorKind::Timeout => "timeout",
            TaskErrorKind::Panicked => "panicked",
            TaskErrorKind::Permanent => "permanent",
            TaskErrorKind::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Uniform error value stored for a task once its retries are exhausted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize)]
#[error("{kind}: {message}")]
pub struct TaskError {
    pub kind: TaskErrorKind,
    pub message: String,
    /// Attempts made before this error became final; 0 until the runner settles it.
    pub attempts: usize,
}

impl TaskError {
    pub fn new(kind: TaskErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            attempts: 0,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Failed, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Timeout, message)
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(TaskErrorKind::Permanent, message)
    }

    pub fn cancelled() -> Self {
        Self::new(TaskErrorKind::Cancelled, "task observed cancellation")
    }

    /// Wrap any error as a retryable failure, keeping its source chain in the message.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(s) = source {
            message.push_str(": ");
            message.push_str(&s.to_string());
            source = s.source();
        }
        Self::failed(message)
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        Self::new(TaskErrorKind::Panicked, panic_message(payload.as_ref()))
    }

    pub(crate) fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            TaskErrorKind::Failed | TaskErrorKind::Timeout | TaskErrorKind::Panicked
        )
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == TaskErrorKind::Cancelled
    }
}

impl From<std::io::Error> for TaskError {
    fn from(err: std::io::Error) -> Self {
        Self::from_error(&err)
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked with a non-string payload".to_string()
    }
}
