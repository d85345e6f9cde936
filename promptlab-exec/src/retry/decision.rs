use std::time::Duration;

use crate::retry::config::RetryConfig;
use crate::runner::TaskError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter { delay: Duration, reason: RetryReason },
    Stop { reason: RetryReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    Backoff,
    AttemptsExhausted,
    NotRetryable,
}

/// Decide whether a failed attempt gets another try.
///
/// - `attempt_no`: 1-based number of the attempt that just failed.
/// - `rand_f64`: uniform sample in `[0, 1)` used for jitter.
pub fn decide_retry(
    cfg: &RetryConfig,
    attempt_no: usize,
    error: &TaskError,
    rand_f64: impl FnOnce() -> f64,
) -> RetryDecision {
    if !error.is_retryable() {
        return RetryDecision::Stop {
            reason: RetryReason::NotRetryable,
        };
    }
    if attempt_no > cfg.retry_attempts {
        return RetryDecision::Stop {
            reason: RetryReason::AttemptsExhausted,
        };
    }
    RetryDecision::RetryAfter {
        delay: backoff_delay(cfg, attempt_no, rand_f64()),
        reason: RetryReason::Backoff,
    }
}

/// `base * 2^(attempt_no-1)`, capped at `max_delay`, then shifted by up to
/// `±jitter_ratio` of itself. `sample` maps `[0, 1)` onto `[-ratio, +ratio)`.
pub fn backoff_delay(cfg: &RetryConfig, attempt_no: usize, sample: f64) -> Duration {
    let exp = attempt_no.saturating_sub(1).min(i32::MAX as usize) as i32;
    let mut raw_ms = cfg.base_delay.as_secs_f64() * 1000.0 * 2f64.powi(exp);
    if let Some(max) = cfg.max_delay {
        raw_ms = raw_ms.min(max.as_secs_f64() * 1000.0);
    }

    if !raw_ms.is_finite() {
        return Duration::MAX;
    }

    let ratio = cfg.jitter_ratio.clamp(0.0, 1.0);
    let jitter_ms = raw_ms * ratio * (2.0 * sample.clamp(0.0, 1.0) - 1.0);
    let nanos = ((raw_ms + jitter_ms).max(0.0) * 1_000_000.0).round();
    if nanos >= u64::MAX as f64 {
        return Duration::MAX;
    }
    Duration::from_nanos(nanos as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(retry_attempts: usize, jitter_ratio: f64) -> RetryConfig {
        RetryConfig {
            retry_attempts,
            base_delay: Duration::from_millis(300),
            jitter_ratio,
            max_delay: None,
        }
    }

    #[test]
    fn backoff_doubles_per_attempt_without_jitter() {
        let c = cfg(5, 0.0);
        assert_eq!(backoff_delay(&c, 1, 0.9), Duration::from_millis(300));
        assert_eq!(backoff_delay(&c, 2, 0.1), Duration::from_millis(600));
        assert_eq!(backoff_delay(&c, 3, 0.5), Duration::from_millis(1200));
    }

    #[test]
    fn jitter_stays_within_twenty_percent() {
        let c = cfg(5, 0.2);
        let low = backoff_delay(&c, 2, 0.0);
        let mid = backoff_delay(&c, 2, 0.5);
        let high = backoff_delay(&c, 2, 0.999_999);
        assert_eq!(low, Duration::from_millis(480));
        assert_eq!(mid, Duration::from_millis(600));
        assert!(high <= Duration::from_millis(720));
        assert!(high > Duration::from_millis(719));
    }

    #[test]
    fn max_delay_caps_before_jitter() {
        let mut c = cfg(10, 0.0);
        c.max_delay = Some(Duration::from_secs(1));
        assert_eq!(backoff_delay(&c, 8, 0.5), Duration::from_secs(1));
    }

    #[test]
    fn huge_attempt_numbers_do_not_panic() {
        let c = cfg(usize::MAX, 0.2);
        let d = backoff_delay(&c, 5_000, 0.5);
        assert_eq!(d, Duration::MAX);
    }

    #[test]
    fn decide_retries_until_attempts_exhausted() {
        let c = cfg(1, 0.0);
        let err = TaskError::failed("boom");
        assert_eq!(
            decide_retry(&c, 1, &err, || 0.5),
            RetryDecision::RetryAfter {
                delay: Duration::from_millis(300),
                reason: RetryReason::Backoff
            }
        );
        assert_eq!(
            decide_retry(&c, 2, &err, || 0.5),
            RetryDecision::Stop {
                reason: RetryReason::AttemptsExhausted
            }
        );
    }

    #[test]
    fn decide_never_retries_permanent_errors() {
        let c = cfg(3, 0.0);
        let err = TaskError::permanent("bad request");
        assert_eq!(
            decide_retry(&c, 1, &err, || 0.5),
            RetryDecision::Stop {
                reason: RetryReason::NotRetryable
            }
        );
    }

    #[test]
    fn zero_retry_attempts_stops_after_first_failure() {
        let c = cfg(0, 0.0);
        let err = TaskError::timeout("slow");
        assert!(matches!(
            decide_retry(&c, 1, &err, || 0.5),
            RetryDecision::Stop {
                reason: RetryReason::AttemptsExhausted
            }
        ));
    }
}
