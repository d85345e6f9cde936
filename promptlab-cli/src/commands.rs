use std::path::PathBuf;

use clap::Subcommand;

use crate::args::*;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse and validate a batch manifest.
    Validate {
        path: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// List the image/model jobs a manifest expands to.
    Plan {
        path: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Generate a prompt for every image/model pair.
    Run {
        path: PathBuf,
        #[arg(long, value_enum, default_value_t = EventsTarget::None)]
        events: EventsTarget,
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        settings: SettingsArgs,
        #[command(flatten)]
        auth: AuthArgs,
    },
}
