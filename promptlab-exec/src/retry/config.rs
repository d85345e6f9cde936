use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries allowed after the first attempt.
    pub retry_attempts: usize,
    pub base_delay: Duration,
    /// Symmetric jitter as a fraction of the computed delay (0.2 = ±20%).
    pub jitter_ratio: f64,
    pub max_delay: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 1,
            base_delay: Duration::from_millis(300),
            jitter_ratio: 0.2,
            max_delay: None,
        }
    }
}

impl RetryConfig {
    pub fn no_retries() -> Self {
        Self {
            retry_attempts: 0,
            ..Default::default()
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.retry_attempts.saturating_add(1)
    }
}
