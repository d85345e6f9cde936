use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    RunStarted {
        run_id: Uuid,
        total: usize,
        workers: usize,
    },
    TaskStarted {
        run_id: Uuid,
        index: usize,
        attempt: usize,
    },
    TaskRetryScheduled {
        run_id: Uuid,
        index: usize,
        attempt: usize,
        delay_ms: u64,
    },
    TaskSucceeded {
        run_id: Uuid,
        index: usize,
        attempts: usize,
    },
    TaskFailed {
        run_id: Uuid,
        index: usize,
        attempts: usize,
        message: String,
    },
    RunFinished {
        run_id: Uuid,
        completed: usize,
        failed: usize,
    },
    RunCancelled {
        run_id: Uuid,
        completed: usize,
    },
}

impl RunEvent {
    pub fn run_id(&self) -> Uuid {
        match self {
            RunEvent::RunStarted { run_id, .. }
            | RunEvent::TaskStarted { run_id, .. }
            | RunEvent::TaskRetryScheduled { run_id, .. }
            | RunEvent::TaskSucceeded { run_id, .. }
            | RunEvent::TaskFailed { run_id, .. }
            | RunEvent::RunFinished { run_id, .. }
            | RunEvent::RunCancelled { run_id, .. } => *run_id,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            RunEvent::RunStarted { run_id, total, workers } => {
                json!({ "type": "run.started", "run_id": run_id.to_string(), "total": total, "workers": workers })
            }
            RunEvent::TaskStarted { run_id, index, attempt } => {
                json!({ "type": "task.started", "run_id": run_id.to_string(), "index": index, "attempt": attempt })
            }
            RunEvent::TaskRetryScheduled { run_id, index, attempt, delay_ms } => {
                json!({ "type": "task.retry_scheduled", "run_id": run_id.to_string(), "index": index, "attempt": attempt, "delay_ms": delay_ms })
            }
            RunEvent::TaskSucceeded { run_id, index, attempts } => {
                json!({ "type": "task.succeeded", "run_id": run_id.to_string(), "index": index, "attempts": attempts })
            }
            RunEvent::TaskFailed { run_id, index, attempts, message } => {
                json!({ "type": "task.failed", "run_id": run_id.to_string(), "index": index, "attempts": attempts, "message": message })
            }
            RunEvent::RunFinished { run_id, completed, failed } => {
                json!({ "type": "run.finished", "run_id": run_id.to_string(), "completed": completed, "failed": failed })
            }
            RunEvent::RunCancelled { run_id, completed } => {
                json!({ "type": "run.cancelled", "run_id": run_id.to_string(), "completed": completed })
            }
        }
    }
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: RunEvent);
}

pub struct CompositeEventSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl Default for CompositeEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeEventSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }
}

#[async_trait]
impl EventSink for CompositeEventSink {
    async fn emit(&self, event: RunEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone()).await;
        }
    }
}

/// Writes one JSON object per event to stderr, keeping stdout for results.
pub struct StderrEventSink;

#[async_trait]
impl EventSink for StderrEventSink {
    async fn emit(&self, event: RunEvent) {
        eprintln!("{}", serde_json::to_string(&event.to_json()).unwrap_or_default());
    }
}

pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: RunEvent) {}
}
