pub mod handler;

use clap::Args;
use std::path::PathBuf;

use super::{NamingArgs, OutputFormat};

#[derive(Args, Debug)]
pub struct SyncCommands {
    /// JSON schema description
    pub file: PathBuf,

    #[command(flatten)]
    pub naming: NamingArgs,

    /// Environment URL (overrides DYNAMICS_URL)
    #[arg(long)]
    pub url: Option<String>,

    /// Bearer token (overrides DYNAMICS_TOKEN)
    #[arg(long)]
    pub token: Option<String>,

    /// Show what would be created without changing anything
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}
