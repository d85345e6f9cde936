use clap::Args;
use promptlab_core::RunSettings;

use crate::output::OutputFormat;

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// Runner overrides. Unset flags fall through to the manifest's `settings`.
#[derive(Debug, Args, Clone)]
pub struct SettingsArgs {
    #[arg(long)]
    pub concurrency: Option<usize>,
    #[arg(long)]
    pub retry_attempts: Option<usize>,
    #[arg(long, value_name = "MS")]
    pub retry_delay_ms: Option<u64>,
    #[arg(long, value_name = "MS")]
    pub max_delay_ms: Option<u64>,
    #[arg(long, value_name = "RATIO")]
    pub jitter: Option<f64>,
}

impl SettingsArgs {
    pub fn to_settings(&self) -> RunSettings {
        RunSettings {
            concurrency: self.concurrency,
            retry_attempts: self.retry_attempts,
            retry_delay_base_ms: self.retry_delay_ms,
            jitter_ratio: self.jitter,
            max_delay_ms: self.max_delay_ms,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct AuthArgs {
    /// Environment variable holding the endpoint's bearer token.
    #[arg(long, default_value = "PROMPTLAB_API_KEY")]
    pub api_key_env: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EventsTarget {
    Stderr,
    None,
}
