//! Console rendering of plans, events and summaries

use colored::*;

use crate::schema::resolve::{AttributeDecl, ResolvedEntity};
use crate::sync::{ObjectKind, PlannedStep, StepAction, SyncEvent, SyncOutcome, SyncPlan, SyncReport};

fn symbol(outcome: &SyncOutcome) -> ColoredString {
    match outcome {
        SyncOutcome::Created => outcome.symbol().green().bold(),
        SyncOutcome::Skipped { .. } => outcome.symbol().dimmed(),
        SyncOutcome::Failed { .. } => outcome.symbol().red().bold(),
    }
}

fn detail(detail: &Option<String>) -> String {
    match detail {
        Some(d) => format!(" ({})", d).dimmed().to_string(),
        None => String::new(),
    }
}

pub fn print_phase_header(kind: ObjectKind) {
    println!();
    println!("{}", kind.phase_label().bold());
}

pub fn print_event(event: &SyncEvent) {
    let status = match &event.outcome {
        SyncOutcome::Created => "created".green().to_string(),
        SyncOutcome::Skipped { reason } => reason.label().dimmed().to_string(),
        SyncOutcome::Failed { error } => error.red().to_string(),
    };

    println!(
        "  {} {} {}{} {}",
        symbol(&event.outcome),
        event.kind.label().dimmed(),
        event.name.cyan(),
        detail(&event.detail),
        status
    );
}

pub fn print_summary(report: &SyncReport) {
    println!();
    println!("{}", "Summary".bold());

    for phase in report.summary() {
        let Some(kind) = phase.kind else { continue };
        println!(
            "  {:<28} {} created, {} skipped, {} failed",
            kind.phase_label(),
            phase.created.to_string().green(),
            phase.skipped.to_string().dimmed(),
            if phase.failed > 0 {
                phase.failed.to_string().red().bold()
            } else {
                phase.failed.to_string().normal()
            }
        );
    }

    if report.has_failures() {
        println!();
        println!("{}", "Failures".red().bold());
        for event in report.failures() {
            if let SyncOutcome::Failed { error } = &event.outcome {
                println!(
                    "  {} {} on {}: {}",
                    event.kind.label(),
                    event.name.cyan(),
                    event.entity,
                    error
                );
            }
        }
    }

    if report.cancelled {
        println!();
        println!("{}", "Sync cancelled before every object was processed".yellow());
    }
}

fn print_step(step: &PlannedStep) {
    let (marker, action) = match &step.action {
        StepAction::Create(ops) if ops.len() > 1 => (
            "+".green().bold(),
            format!("create ({} requests)", ops.len()).green().to_string(),
        ),
        StepAction::Create(_) => ("+".green().bold(), "create".green().to_string()),
        StepAction::Skip(reason) => ("=".dimmed(), reason.label().dimmed().to_string()),
        StepAction::Reject(error) => ("×".red().bold(), error.red().to_string()),
    };

    println!(
        "  {} {} {}{} {}",
        marker,
        step.kind.label().dimmed(),
        step.name.cyan(),
        detail(&step.detail),
        action
    );
}

/// Dry-run rendering: every object with its create/skip decision
pub fn print_plan(plan: &SyncPlan) {
    for kind in ObjectKind::all() {
        let mut steps = plan.steps_of(*kind).peekable();
        if steps.peek().is_none() {
            continue;
        }
        print_phase_header(*kind);
        for step in steps {
            print_step(step);
        }
    }

    println!();
    println!(
        "{} to create, {} to skip, {} requests",
        plan.create_count().to_string().green().bold(),
        plan.skip_count().to_string().dimmed(),
        plan.all_operations().len()
    );
}

/// Offline rendering of derived names and shapes
pub fn print_resolved(entities: &[ResolvedEntity]) {
    for resolved in entities {
        let entity = &resolved.entity;
        println!();
        println!(
            "{} {} {}",
            resolved.name.bold(),
            "->".dimmed(),
            entity.schema_name.cyan()
        );
        println!(
            "  {:<14} {}",
            "collection".dimmed(),
            entity.logical_collection_name
        );
        println!(
            "  {:<14} {} ({})",
            "primary".dimmed(),
            entity.primary_attribute.schema_name,
            entity.primary_attribute.kind.tag()
        );

        for attribute in &resolved.attributes {
            match attribute {
                AttributeDecl::Mapped(spec) => println!(
                    "  {:<14} {} ({})",
                    "attribute".dimmed(),
                    spec.schema_name,
                    spec.kind.tag()
                ),
                AttributeDecl::Unmapped { schema_name, error } => println!(
                    "  {:<14} {} {}",
                    "attribute".dimmed(),
                    schema_name,
                    format!("unknown type '{}'", error.tag).red()
                ),
            }
        }

        if let Some(key) = &resolved.key {
            println!(
                "  {:<14} {} [{}]",
                "key".dimmed(),
                key.schema_name,
                key.key_attributes.join(", ")
            );
        }

        for lookup in &resolved.many_to_one {
            println!(
                "  {:<14} {} -> {}",
                "many-to-one".dimmed(),
                lookup.schema_name,
                lookup.referenced_entity
            );
        }

        for intersection in &resolved.many_to_many {
            let [first, second] = intersection.participants();
            println!(
                "  {:<14} {} ({} *-* {}, key {})",
                "many-to-many".dimmed(),
                intersection.entity.schema_name,
                first,
                second,
                intersection.key.schema_name
            );
        }
    }
}
