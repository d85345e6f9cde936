use crate::runner::error::TaskError;

/// Terminal state of one task: its value, or the error left after retries.
pub type TaskOutcome<T> = Result<T, TaskError>;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TaskFailure {
    pub index: usize,
    pub error: TaskError,
}

#[derive(Debug, Clone)]
pub struct RunResult<T> {
    /// `results[i]` is the outcome of `tasks[i]`.
    pub results: Vec<TaskOutcome<T>>,
    pub completed: usize,
    pub total: usize,
    pub errors: Vec<TaskFailure>,
}

impl<T> RunResult<T> {
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            completed: 0,
            total: 0,
            errors: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A task that reached its terminal state inside a worker.
#[derive(Debug)]
pub(crate) struct Settled<T> {
    pub index: usize,
    pub outcome: TaskOutcome<T>,
}
