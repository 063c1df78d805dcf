pub mod handler;

use clap::Args;
use std::path::PathBuf;

use super::{NamingArgs, OutputFormat};

#[derive(Args, Debug)]
pub struct PlanCommands {
    /// JSON schema description
    pub file: PathBuf,

    #[command(flatten)]
    pub naming: NamingArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}
