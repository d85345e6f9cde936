use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use promptlab_core::RunSettings;
use tokio_util::sync::CancellationToken;

use crate::retry::RetryConfig;
use crate::runner::error::RunError;

/// Called with `(completed, total)` each time a task settles.
pub type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

#[derive(Clone)]
pub struct RunConfig {
    pub concurrency: usize,
    pub retry: RetryConfig,
    pub cancel: Option<CancellationToken>,
    pub on_progress: Option<ProgressFn>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            retry: RetryConfig::default(),
            cancel: None,
            on_progress: None,
        }
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("concurrency", &self.concurrency)
            .field("retry", &self.retry)
            .field("cancel", &self.cancel)
            .field("on_progress", &self.on_progress.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl RunConfig {
    /// Build from layered settings; unset fields keep the defaults.
    pub fn from_settings(settings: &RunSettings) -> Result<Self, RunError> {
        let defaults = RetryConfig::default();
        let config = Self {
            concurrency: settings.concurrency.unwrap_or(2),
            retry: RetryConfig {
                retry_attempts: settings.retry_attempts.unwrap_or(defaults.retry_attempts),
                base_delay: settings
                    .retry_delay_base_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.base_delay),
                jitter_ratio: settings.jitter_ratio.unwrap_or(defaults.jitter_ratio),
                max_delay: settings.max_delay_ms.map(Duration::from_millis),
            },
            cancel: None,
            on_progress: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_progress(mut self, f: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(f));
        self
    }

    pub fn validate(&self) -> Result<(), RunError> {
        if self.concurrency == 0 {
            return Err(RunError::InvalidConfiguration(
                "concurrency must be a positive integer".to_string(),
            ));
        }
        let ratio = self.retry.jitter_ratio;
        if !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) {
            return Err(RunError::InvalidConfiguration(format!(
                "jitter ratio must be between 0 and 1 (got {ratio})"
            )));
        }
        Ok(())
    }
}
