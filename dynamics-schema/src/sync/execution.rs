//! Execution of sync plans against a metadata service
//!
//! Objects are created one at a time, each request awaited before the next
//! is sent. A failed object is recorded and the run moves on; only
//! cancellation stops a run early.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};

use crate::api::operations::Operation;
use crate::api::service::MetadataService;
use crate::schema::model::EntityDefinition;
use crate::schema::naming::NamingContext;
use crate::schema::resolve::{TypePolicy, resolve_all};

use super::plan::{PlannedStep, StepAction, SyncPlan, build_plan};
use super::report::SyncReport;
use super::types::{ObjectKind, SyncEvent, SyncOutcome};

/// Resolve `definitions`, take the snapshot and build the plan
///
/// Resolution happens first, so invalid input fails without any request
/// being made.
pub async fn prepare_plan(
    service: &dyn MetadataService,
    definitions: &[EntityDefinition],
    ctx: &NamingContext,
    policy: TypePolicy,
) -> Result<SyncPlan> {
    let resolved = resolve_all(definitions, ctx, policy)?;
    log::info!("Resolved {} entity definitions", resolved.len());

    let snapshot = service
        .fetch_snapshot()
        .await
        .context("Failed to read the current schema")?;

    Ok(build_plan(&resolved, &snapshot, ctx))
}

/// Execute every step of `plan` in order
///
/// `on_event` is called once per object as soon as its outcome is known.
/// `cancel` is checked before each object; the request in flight when it is
/// raised still completes.
pub async fn execute_plan<F>(
    service: &dyn MetadataService,
    plan: &SyncPlan,
    cancel: &AtomicBool,
    mut on_event: F,
) -> SyncReport
where
    F: FnMut(&SyncEvent),
{
    let mut report = SyncReport::new();
    let mut failed_entities: HashSet<String> = HashSet::new();
    let mut phase: Option<ObjectKind> = None;

    for step in plan.steps() {
        if cancel.load(Ordering::SeqCst) {
            log::warn!("Sync cancelled, {} objects processed", report.events.len());
            report.cancelled = true;
            break;
        }

        if phase != Some(step.kind) {
            phase = Some(step.kind);
            log::info!("{}", step.kind.phase_label());
        }

        let outcome = match &step.action {
            StepAction::Skip(reason) => SyncOutcome::Skipped { reason: *reason },
            StepAction::Reject(error) => SyncOutcome::Failed {
                error: error.clone(),
            },
            StepAction::Create(operations) => {
                match step.depends_on.iter().find(|e| failed_entities.contains(*e)) {
                    Some(missing) => SyncOutcome::Failed {
                        error: format!("entity '{}' was not created", missing),
                    },
                    None => run_step(service, step, operations).await,
                }
            }
        };

        match &outcome {
            SyncOutcome::Created => log::info!("Created {} {}", step.kind.label(), step.name),
            SyncOutcome::Skipped { reason } => {
                log::debug!("Skipped {} {}: {}", step.kind.label(), step.name, reason.label())
            }
            SyncOutcome::Failed { error } => {
                log::warn!("Failed {} {}: {}", step.kind.label(), step.name, error)
            }
        }

        if step.kind == ObjectKind::Entity && outcome.is_failed() {
            failed_entities.insert(step.entity.clone());
        }

        let event = SyncEvent {
            kind: step.kind,
            entity: step.entity.clone(),
            name: step.name.clone(),
            outcome,
            detail: step.detail.clone(),
        };
        on_event(&event);
        report.push(event);
    }

    report
}

/// Send the operations of one step, stopping at the first failure
async fn run_step(
    service: &dyn MetadataService,
    step: &PlannedStep,
    operations: &[Operation],
) -> SyncOutcome {
    let multi = operations.len() > 1;

    for operation in operations {
        let failure = match service.execute(operation).await {
            Ok(result) if result.is_success() => continue,
            Ok(result) => result.error_message(),
            Err(err) => format!("{:#}", err),
        };

        // Name the failing request when one object takes several
        let error = if multi {
            format!(
                "{} {}: {}",
                operation.operation_type(),
                operation.schema_name().unwrap_or(&step.name),
                failure
            )
        } else {
            failure
        };
        return SyncOutcome::Failed { error };
    }

    SyncOutcome::Created
}

/// Prepare and execute in one go
pub async fn run_sync<F>(
    service: &dyn MetadataService,
    definitions: &[EntityDefinition],
    ctx: &NamingContext,
    policy: TypePolicy,
    cancel: &AtomicBool,
    on_event: F,
) -> Result<SyncReport>
where
    F: FnMut(&SyncEvent),
{
    let plan = prepare_plan(service, definitions, ctx, policy).await?;
    Ok(execute_plan(service, &plan, cancel, on_event).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::metadata::{AttributeMetadata, EntityMetadata};
    use crate::schema::load;
    use crate::sync::testing::MemoryService;
    use crate::sync::types::SkipReason;

    const COUNTRY: &str = r#"[{
        "Name": "Country",
        "Members": { "ID": "String", "Active": "Boolean", "Capital": "String" },
        "PrimaryKey": null
    }]"#;

    const AB_LINK: &str = r#"[
        { "Name": "A", "Members": { "Name": "String" }, "ManyToMany": { "AB_Link": "B" } },
        { "Name": "B", "Members": { "Name": "String" } }
    ]"#;

    async fn sync(service: &MemoryService, json: &str) -> Result<SyncReport> {
        let cancel = AtomicBool::new(false);
        run_sync(
            service,
            &load(json).unwrap(),
            &NamingContext::default(),
            TypePolicy::Strict,
            &cancel,
            |_| {},
        )
        .await
    }

    fn outcomes(report: &SyncReport) -> Vec<(String, SyncOutcome)> {
        report
            .events
            .iter()
            .map(|e| (e.name.clone(), e.outcome.clone()))
            .collect()
    }

    fn exists() -> SyncOutcome {
        SyncOutcome::Skipped {
            reason: SkipReason::AlreadyExists,
        }
    }

    #[tokio::test]
    async fn test_country_created_from_scratch() {
        let service = MemoryService::new();
        let report = sync(&service, COUNTRY).await.unwrap();

        assert_eq!(
            outcomes(&report),
            vec![
                ("oap_country".to_string(), SyncOutcome::Created),
                ("oap_active".to_string(), SyncOutcome::Created),
                ("oap_capital".to_string(), SyncOutcome::Created),
            ]
        );
        assert_eq!(
            service.executed_names(),
            vec![
                ("create_entity".to_string(), "oap_country".to_string()),
                ("create_attribute".to_string(), "oap_active".to_string()),
                ("create_attribute".to_string(), "oap_capital".to_string()),
            ]
        );
        assert!(!report.has_failures());
    }

    #[tokio::test]
    async fn test_second_run_skips_everything() {
        let service = MemoryService::new();
        sync(&service, COUNTRY).await.unwrap();
        let sent = service.executed().len();

        let report = sync(&service, COUNTRY).await.unwrap();
        assert!(report.events.iter().all(|e| e.outcome == exists()));
        assert_eq!(service.executed().len(), sent);
    }

    #[tokio::test]
    async fn test_partial_rerun_creates_only_missing() {
        let mut country = EntityMetadata::new("oap_country");
        for name in ["oap_id", "oap_capital"] {
            country.attributes.push(AttributeMetadata {
                logical_name: name.to_string(),
                schema_name: Some(name.to_string()),
                attribute_type: Some("String".to_string()),
            });
        }
        let service = MemoryService::with_entities(vec![country]);

        let report = sync(&service, COUNTRY).await.unwrap();
        assert_eq!(
            outcomes(&report),
            vec![
                ("oap_country".to_string(), exists()),
                ("oap_active".to_string(), SyncOutcome::Created),
                ("oap_capital".to_string(), exists()),
            ]
        );
        assert_eq!(
            service.executed_names(),
            vec![("create_attribute".to_string(), "oap_active".to_string())]
        );
    }

    #[tokio::test]
    async fn test_non_string_primary_field_makes_no_requests() {
        let service = MemoryService::new();
        let json = r#"[{ "Name": "Country", "Members": { "ID": "Integer", "Name": "String" } }]"#;

        let err = sync(&service, json).await.unwrap_err();
        assert!(err.to_string().contains("Primary attribute has to be a string"));
        assert!(service.executed().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_type_strict_aborts_before_requests() {
        let service = MemoryService::new();
        let json = r#"[{ "Name": "A", "Members": { "ID": "String", "Photo": "Picture" } }]"#;

        assert!(sync(&service, json).await.is_err());
        assert!(service.executed().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_type_lenient_reports_failure() {
        let service = MemoryService::new();
        let json = r#"[{ "Name": "A", "Members": { "ID": "String", "Photo": "Picture", "Size": "Long" } }]"#;
        let cancel = AtomicBool::new(false);

        let report = run_sync(
            &service,
            &load(json).unwrap(),
            &NamingContext::default(),
            TypePolicy::Lenient,
            &cancel,
            |_| {},
        )
        .await
        .unwrap();

        let failed: Vec<&str> = report.failures().map(|e| e.name.as_str()).collect();
        assert_eq!(failed, vec!["oap_photo"]);
        assert_eq!(report.totals().created, 2);
    }

    #[tokio::test]
    async fn test_relationships_follow_their_entities() {
        let service = MemoryService::new();
        let json = r#"[
            { "Name": "City", "Members": { "Name": "String" }, "ManyToOne": { "City_Country": "Country" } },
            { "Name": "Country", "Members": { "Name": "String" } }
        ]"#;

        let report = sync(&service, json).await.unwrap();
        assert!(!report.has_failures());

        let sent = service.executed_names();
        let position = |name: &str| sent.iter().position(|(_, n)| n == name).unwrap();
        assert!(position("oap_city") < position("oap_city_country"));
        assert!(position("oap_country") < position("oap_city_country"));

        let city = service.snapshot();
        let city = city.find_by_logical_name("oap_city").unwrap();
        assert!(city.has_attribute("oap_city_country"));
    }

    #[tokio::test]
    async fn test_many_to_many_intersection_entity() {
        let service = MemoryService::new();
        let report = sync(&service, AB_LINK).await.unwrap();
        assert!(!report.has_failures());

        let link: Vec<&SyncEvent> = report
            .events
            .iter()
            .filter(|e| e.kind == ObjectKind::ManyToMany)
            .collect();
        assert_eq!(link.len(), 1);
        assert_eq!(link[0].name, "oap_ab_link");
        assert_eq!(link[0].outcome, SyncOutcome::Created);

        let snapshot = service.snapshot();
        let intersection = snapshot.find_by_logical_name("oap_ab_link").unwrap();
        assert!(intersection.has_attribute("oap_name"));
        assert!(intersection.has_attribute("oap_ab_link_a"));
        assert!(intersection.has_attribute("oap_ab_link_b"));
        assert!(intersection.has_key("oap_relationshipid"));

        // Rerun leaves the intersection alone
        let rerun = sync(&service, AB_LINK).await.unwrap();
        assert!(rerun.events.iter().all(|e| e.outcome.is_skipped()));
    }

    #[tokio::test]
    async fn test_self_referencing_many_to_many() {
        let service = MemoryService::new();
        let json = r#"[{ "Name": "Person", "Members": { "Name": "String" }, "ManyToMany": { "Person_Friend": "Person" } }]"#;

        let report = sync(&service, json).await.unwrap();
        assert!(!report.has_failures());

        let executed = service.executed_names();
        for lookup in ["oap_person_friend_person", "oap_person_friend_relatedperson"] {
            assert!(executed.contains(&("create_one_to_many".to_string(), lookup.to_string())));
        }

        let snapshot = service.snapshot();
        let intersection = snapshot.find_by_logical_name("oap_person_friend").unwrap();
        assert!(intersection.has_attribute("oap_person_friend_person"));
        assert!(intersection.has_attribute("oap_person_friend_relatedperson"));
        assert!(intersection.has_key("oap_relationshipid"));
    }

    #[tokio::test]
    async fn test_duplicate_lookup_is_rejected_by_service() {
        let service = MemoryService::new();
        sync(&service, AB_LINK).await.unwrap();

        let duplicate = service
            .executed()
            .into_iter()
            .find(|op| op.schema_name() == Some("oap_ab_link_a"))
            .unwrap();
        let result = service.execute(&duplicate).await.unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("already exists"));
    }

    #[tokio::test]
    async fn test_many_to_many_colliding_with_declared_entity() {
        let service = MemoryService::new();
        let json = r#"[
            { "Name": "A", "Members": { "Name": "String" }, "ManyToMany": { "B": "C" } },
            { "Name": "B", "Members": { "Name": "String" } },
            { "Name": "C", "Members": { "Name": "String" } }
        ]"#;

        let report = sync(&service, json).await.unwrap();

        let link = report
            .events
            .iter()
            .find(|e| e.kind == ObjectKind::ManyToMany)
            .unwrap();
        assert_eq!(link.name, "oap_b");
        assert!(matches!(&link.outcome, SyncOutcome::Failed { error } if error.contains("collides")));

        let entity_requests = service
            .executed_names()
            .into_iter()
            .filter(|(kind, name)| kind == "create_entity" && name == "oap_b")
            .count();
        assert_eq!(entity_requests, 1);
    }

    #[tokio::test]
    async fn test_remote_failure_does_not_abort_run() {
        let service = MemoryService::new().failing("oap_active");
        let report = sync(&service, COUNTRY).await.unwrap();

        assert_eq!(
            outcomes(&report),
            vec![
                ("oap_country".to_string(), SyncOutcome::Created),
                (
                    "oap_active".to_string(),
                    SyncOutcome::Failed {
                        error: "Simulated failure (HTTP 400)".to_string()
                    }
                ),
                ("oap_capital".to_string(), SyncOutcome::Created),
            ]
        );
        assert!(report.has_failures());
    }

    #[tokio::test]
    async fn test_transport_error_recorded_against_object() {
        let service = MemoryService::new().unreachable("oap_capital");
        let report = sync(&service, COUNTRY).await.unwrap();

        let failed: Vec<&SyncEvent> = report.failures().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].name, "oap_capital");
        assert!(matches!(&failed[0].outcome, SyncOutcome::Failed { error } if error.contains("connection reset")));
    }

    #[tokio::test]
    async fn test_failed_entity_propagates_to_dependents() {
        let service = MemoryService::new().failing("oap_country");
        let json = r#"[
            { "Name": "Country", "PrimaryKey": "ISO", "Members": { "Name": "String", "ISO": "String" } },
            { "Name": "City", "Members": { "Name": "String" }, "ManyToOne": { "City_Country": "Country" } }
        ]"#;

        let report = sync(&service, json).await.unwrap();

        let not_created = SyncOutcome::Failed {
            error: "entity 'oap_country' was not created".to_string(),
        };
        let by_name = |name: &str| {
            report
                .events
                .iter()
                .find(|e| e.name == name)
                .map(|e| e.outcome.clone())
                .unwrap()
        };
        assert_eq!(by_name("oap_iso"), not_created);
        assert_eq!(by_name("oap_city_country"), not_created);
        assert_eq!(by_name("oap_city"), SyncOutcome::Created);

        // Only the entity requests went out
        let sent: Vec<String> = service.executed_names().into_iter().map(|(_, n)| n).collect();
        assert_eq!(sent, vec!["oap_country", "oap_city"]);
    }

    #[tokio::test]
    async fn test_intersection_failure_names_request() {
        let service = MemoryService::new().failing("oap_ab_link_b");
        let report = sync(&service, AB_LINK).await.unwrap();

        let failed: Vec<&SyncEvent> = report.failures().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].name, "oap_ab_link");
        assert_eq!(
            failed[0].outcome,
            SyncOutcome::Failed {
                error: "create_one_to_many oap_ab_link_b: Simulated failure (HTTP 400)".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_cancellation_stops_before_next_object() {
        let service = MemoryService::new();
        let cancel = AtomicBool::new(false);
        let mut seen = Vec::new();

        let report = run_sync(
            &service,
            &load(COUNTRY).unwrap(),
            &NamingContext::default(),
            TypePolicy::Strict,
            &cancel,
            |event| {
                seen.push(event.name.clone());
                cancel.store(true, Ordering::SeqCst);
            },
        )
        .await
        .unwrap();

        assert!(report.cancelled);
        assert_eq!(seen, vec!["oap_country"]);
        assert_eq!(report.events.len(), 1);
        assert_eq!(service.executed().len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_failure_is_fatal() {
        let service = MemoryService::new().snapshot_fails();
        let err = sync(&service, COUNTRY).await.unwrap_err();
        assert!(format!("{:#}", err).contains("401 Unauthorized"));
        assert!(service.executed().is_empty());
    }

    #[tokio::test]
    async fn test_events_streamed_in_order() {
        let service = MemoryService::new();
        let cancel = AtomicBool::new(false);
        let mut kinds = Vec::new();

        run_sync(
            &service,
            &load(AB_LINK).unwrap(),
            &NamingContext::default(),
            TypePolicy::Strict,
            &cancel,
            |event| kinds.push(event.kind),
        )
        .await
        .unwrap();

        let mut sorted = kinds.clone();
        sorted.sort();
        assert_eq!(kinds, sorted);
    }
}
