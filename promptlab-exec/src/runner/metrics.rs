use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::runner::events::{EventSink, RunEvent};

#[derive(Debug, Clone, Default)]
pub struct RunMetrics {
    pub run_id: Option<Uuid>,
    pub status: String,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
    pub total_duration: Option<Duration>,
    pub tasks_total: usize,
    pub tasks_succeeded: usize,
    pub tasks_failed: usize,
    pub attempts: usize,
    pub retries: usize,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, run_id: Uuid, total: usize) {
        self.run_id = Some(run_id);
        self.status = "running".to_string();
        self.tasks_total = total;
        self.started_at = Some(Instant::now());
    }

    pub fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    pub fn record_retry(&mut self) {
        self.retries += 1;
    }

    pub fn record_success(&mut self) {
        self.tasks_succeeded += 1;
    }

    pub fn record_failure(&mut self) {
        self.tasks_failed += 1;
    }

    pub fn settled(&self) -> usize {
        self.tasks_succeeded + self.tasks_failed
    }

    pub fn finish(&mut self, status: &str) {
        self.status = status.to_string();
        self.finished_at = Some(Instant::now());
        if let (Some(started), Some(finished)) = (self.started_at, self.finished_at) {
            self.total_duration = Some(finished.duration_since(started));
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "run_id": self.run_id.map(|id| id.to_string()),
            "status": self.status,
            "duration_ms": self.total_duration.map(|d| d.as_millis() as u64),
            "tasks": {
                "total": self.tasks_total,
                "succeeded": self.tasks_succeeded,
                "failed": self.tasks_failed,
            },
            "attempts": self.attempts,
            "retries": self.retries,
        })
    }
}

#[derive(Default)]
pub struct MetricsCollector {
    metrics: Arc<Mutex<RunMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_metrics(&self) -> RunMetrics {
        self.metrics.lock().await.clone()
    }

    async fn apply(&self, event: &RunEvent) {
        let mut m = self.metrics.lock().await;
        match event {
            RunEvent::RunStarted { run_id, total, .. } => m.start(*run_id, *total),
            RunEvent::TaskStarted { .. } => m.record_attempt(),
            RunEvent::TaskRetryScheduled { .. } => m.record_retry(),
            RunEvent::TaskSucceeded { .. } => m.record_success(),
            RunEvent::TaskFailed { .. } => m.record_failure(),
            RunEvent::RunFinished { failed, .. } => {
                m.finish(if *failed == 0 { "succeeded" } else { "partial" })
            }
            RunEvent::RunCancelled { .. } => m.finish("cancelled"),
        }
    }
}

/// Feeds a [`MetricsCollector`] and forwards every event to `base`.
pub struct MetricsEventSink {
    collector: Arc<MetricsCollector>,
    base: Arc<dyn EventSink>,
}

impl MetricsEventSink {
    pub fn new(collector: Arc<MetricsCollector>, base: Arc<dyn EventSink>) -> Self {
        Self { collector, base }
    }
}

#[async_trait]
impl EventSink for MetricsEventSink {
    async fn emit(&self, event: RunEvent) {
        self.collector.apply(&event).await;
        self.base.emit(event).await;
    }
}
