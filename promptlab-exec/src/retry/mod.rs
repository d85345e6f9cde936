mod config;
mod decision;

pub use config::RetryConfig;
pub use decision::{backoff_delay, decide_retry, RetryDecision, RetryReason};
