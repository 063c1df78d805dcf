//! Command line interface

pub mod commands;
pub mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use commands::plan::PlanCommands;
use commands::sync::SyncCommands;

#[derive(Parser, Debug)]
#[command(
    name = "dynamics-schema",
    version,
    about = "Create Dataverse tables, columns, keys and relationships from a JSON description"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create everything missing from the target environment
    Sync(SyncCommands),
    /// Show the names that would be derived, without contacting the environment
    Plan(PlanCommands),
}

/// Run the selected command. `Ok(false)` means at least one object failed.
pub async fn run(cli: Cli, cancel: Arc<AtomicBool>) -> Result<bool> {
    match cli.command {
        Commands::Sync(args) => commands::sync::handler::handle_sync_command(args, &cancel).await,
        Commands::Plan(args) => commands::plan::handler::handle_plan_command(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sync_flags() {
        let cli = Cli::try_parse_from([
            "dynamics-schema",
            "sync",
            "schema.json",
            "--prefix",
            "cgk",
            "--locale",
            "2057",
            "--dry-run",
            "--output",
            "json",
        ])
        .unwrap();

        let Commands::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        assert_eq!(args.file.to_str(), Some("schema.json"));
        assert_eq!(args.naming.prefix.as_deref(), Some("cgk"));
        assert_eq!(args.naming.locale, Some(2057));
        assert!(args.dry_run);
        assert_eq!(args.output, commands::OutputFormat::Json);
    }

    #[test]
    fn test_parse_plan() {
        let cli = Cli::try_parse_from(["dynamics-schema", "plan", "schema.json", "--lenient"]).unwrap();
        let Commands::Plan(args) = cli.command else {
            panic!("expected plan");
        };
        assert!(args.naming.lenient);
        assert!(args.naming.prefix.is_none());
    }

    #[test]
    fn test_file_required() {
        assert!(Cli::try_parse_from(["dynamics-schema", "sync"]).is_err());
    }
}
