//! Sync command handler

use anyhow::{Context, Result};
use colored::*;
use std::sync::atomic::AtomicBool;

use super::SyncCommands;
use crate::api::DynamicsClient;
use crate::cli::commands::{OutputFormat, load_config, read_definitions};
use crate::cli::output;
use crate::sync::{ObjectKind, execute_plan, prepare_plan};

/// Handle the sync command. Returns `false` when any object failed.
pub async fn handle_sync_command(args: SyncCommands, cancel: &AtomicBool) -> Result<bool> {
    // Handle --no-color flag
    if args.naming.no_color {
        colored::control::set_override(false);
    }

    let config = load_config(&args.naming, args.url.clone(), args.token.clone())?;
    let definitions = read_definitions(&args.file)?;
    let ctx = config.naming_context();

    let (url, token) = config.credentials()?;
    let client = DynamicsClient::with_api_version(url, token, config.connection.api_version.clone())
        .context("Failed to create Dynamics client")?;

    let text = args.output == OutputFormat::Text;
    if text {
        println!(
            "Syncing {} to {} (solution {}, prefix '{}')",
            args.file.display().to_string().cyan(),
            client.base_url().bright_green().bold(),
            ctx.solution_unique_name.bold(),
            ctx.prefix
        );
    }

    let plan = prepare_plan(&client, &definitions, &ctx, config.sync.type_policy).await?;

    if args.dry_run {
        match args.output {
            OutputFormat::Text => {
                output::print_plan(&plan);
                println!();
                println!("{}", "Dry run, nothing was changed".yellow());
            }
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&plan).context("Failed to format JSON output")?;
                println!("{}", json);
            }
        }
        return Ok(true);
    }

    let mut phase: Option<ObjectKind> = None;
    let report = execute_plan(&client, &plan, cancel, |event| {
        if !text {
            return;
        }
        if phase != Some(event.kind) {
            phase = Some(event.kind);
            output::print_phase_header(event.kind);
        }
        output::print_event(event);
    })
    .await;

    match args.output {
        OutputFormat::Text => output::print_summary(&report),
        OutputFormat::Json => {
            println!("{}", report.to_json().context("Failed to format JSON output")?);
        }
    }

    Ok(!report.has_failures())
}
