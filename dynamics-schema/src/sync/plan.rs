//! Plan builder for schema sync runs
//!
//! Diffs resolved entities against the snapshot and converts them into an
//! ordered list of planned steps. Steps are ordered by phase:
//! - Entities (with their primary attribute)
//! - Attributes
//! - Keys
//! - Many-to-one relationships
//! - Many-to-many relationships (intersection entities)
//!
//! Planning is pure: nothing here talks to the service.

use std::collections::HashSet;

use serde::Serialize;

use crate::api::metadata::{RelationshipType, SchemaSnapshot};
use crate::api::operations::Operation;
use crate::schema::naming::NamingContext;
use crate::schema::payload;
use crate::schema::resolve::{AttributeDecl, IntersectionSpec, ResolvedEntity};

use super::types::{ObjectKind, SkipReason};

/// What to do with a single schema object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StepAction {
    /// Send these operations, in order
    Create(Vec<Operation>),
    /// Leave the object alone
    Skip(SkipReason),
    /// Cannot be built locally; reported as failed without contacting the service
    Reject(String),
}

/// A single planned schema object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedStep {
    pub kind: ObjectKind,
    /// Logical name of the owning entity
    pub entity: String,
    /// Schema name of the object
    pub name: String,
    pub action: StepAction,
    /// Entities created earlier in the same run that this step needs
    pub depends_on: Vec<String>,
    pub detail: Option<String>,
}

impl PlannedStep {
    pub fn is_create(&self) -> bool {
        matches!(self.action, StepAction::Create(_))
    }

    pub fn is_skip(&self) -> bool {
        matches!(self.action, StepAction::Skip(_))
    }
}

/// Complete, ordered plan for one sync run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncPlan {
    steps: Vec<PlannedStep>,
}

impl SyncPlan {
    /// Steps in execution order
    pub fn steps(&self) -> &[PlannedStep] {
        &self.steps
    }

    pub fn steps_of(&self, kind: ObjectKind) -> impl Iterator<Item = &PlannedStep> {
        self.steps.iter().filter(move |s| s.kind == kind)
    }

    /// All operations in execution order
    pub fn all_operations(&self) -> Vec<&Operation> {
        self.steps
            .iter()
            .filter_map(|step| match &step.action {
                StepAction::Create(ops) => Some(ops.iter()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn create_count(&self) -> usize {
        self.steps.iter().filter(|s| s.is_create()).count()
    }

    pub fn skip_count(&self) -> usize {
        self.steps.iter().filter(|s| s.is_skip()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn push(&mut self, step: PlannedStep) {
        self.steps.push(step);
    }
}

/// Build the sync plan for `entities` against `snapshot`
pub fn build_plan(
    entities: &[ResolvedEntity],
    snapshot: &SchemaSnapshot,
    ctx: &NamingContext,
) -> SyncPlan {
    let mut builder = PlanBuilder {
        snapshot,
        locale: ctx.locale,
        solution: Some(ctx.solution_unique_name.clone()),
        created: HashSet::new(),
        plan: SyncPlan::default(),
    };

    for entity in entities {
        builder.entity(entity);
    }
    for entity in entities {
        builder.attributes(entity);
    }
    for entity in entities {
        builder.key(entity);
    }
    for entity in entities {
        builder.many_to_one(entity);
    }

    let mut planned_intersections = HashSet::new();
    for entity in entities {
        for intersection in &entity.many_to_many {
            builder.intersection(entity, intersection, &mut planned_intersections);
        }
    }

    let plan = builder.plan;
    log::debug!(
        "Planned {} steps ({} to create, {} to skip)",
        plan.steps.len(),
        plan.create_count(),
        plan.skip_count()
    );
    plan
}

struct PlanBuilder<'a> {
    snapshot: &'a SchemaSnapshot,
    locale: u32,
    solution: Option<String>,
    /// Logical names of entities this plan creates
    created: HashSet<String>,
    plan: SyncPlan,
}

impl PlanBuilder<'_> {
    fn depends_on<'n>(&self, entities: impl IntoIterator<Item = &'n str>) -> Vec<String> {
        let mut deps: Vec<String> = Vec::new();
        for entity in entities {
            if self.created.contains(entity) && !deps.iter().any(|d| d == entity) {
                deps.push(entity.to_string());
            }
        }
        deps
    }

    fn entity(&mut self, resolved: &ResolvedEntity) {
        let spec = &resolved.entity;

        let action = if self.snapshot.find_by_logical_name(&spec.logical_name).is_some() {
            StepAction::Skip(SkipReason::AlreadyExists)
        } else {
            self.created.insert(spec.logical_name.clone());
            StepAction::Create(vec![Operation::create_entity(
                spec.logical_name.clone(),
                payload::entity(spec, self.locale),
                self.solution.clone(),
            )])
        };

        self.plan.push(PlannedStep {
            kind: ObjectKind::Entity,
            entity: spec.logical_name.clone(),
            name: spec.schema_name.clone(),
            action,
            depends_on: Vec::new(),
            detail: Some(format!("primary field {}", spec.primary_attribute.schema_name)),
        });
    }

    fn attributes(&mut self, resolved: &ResolvedEntity) {
        let entity_name = &resolved.entity.logical_name;
        let existing = self.snapshot.find_by_logical_name(entity_name);
        let depends_on = self.depends_on([entity_name.as_str()]);

        for attribute in &resolved.attributes {
            let action = match attribute {
                AttributeDecl::Mapped(spec) => {
                    if existing.is_some_and(|e| e.has_attribute(&spec.logical_name)) {
                        StepAction::Skip(SkipReason::AlreadyExists)
                    } else {
                        StepAction::Create(vec![Operation::create_attribute(
                            entity_name.clone(),
                            payload::attribute(spec, self.locale),
                            self.solution.clone(),
                        )])
                    }
                }
                AttributeDecl::Unmapped { error, .. } => StepAction::Reject(error.to_string()),
            };

            let detail = match attribute {
                AttributeDecl::Mapped(spec) => Some(spec.kind.tag().to_string()),
                AttributeDecl::Unmapped { error, .. } => Some(error.tag.clone()),
            };

            self.plan.push(PlannedStep {
                kind: ObjectKind::Attribute,
                entity: entity_name.clone(),
                name: attribute.schema_name().to_string(),
                action,
                depends_on: depends_on.clone(),
                detail,
            });
        }
    }

    fn key(&mut self, resolved: &ResolvedEntity) {
        let Some(key) = &resolved.key else {
            return;
        };

        let entity_name = &resolved.entity.logical_name;
        let exists = self
            .snapshot
            .find_by_logical_name(entity_name)
            .is_some_and(|e| e.has_key(&key.logical_name));

        let action = if exists {
            StepAction::Skip(SkipReason::AlreadyExists)
        } else {
            StepAction::Create(vec![Operation::create_key(
                entity_name.clone(),
                payload::key(key, self.locale),
                self.solution.clone(),
            )])
        };

        self.plan.push(PlannedStep {
            kind: ObjectKind::Key,
            entity: entity_name.clone(),
            name: key.schema_name.clone(),
            action,
            depends_on: self.depends_on([entity_name.as_str()]),
            detail: Some(key.key_attributes.join(", ")),
        });
    }

    fn many_to_one(&mut self, resolved: &ResolvedEntity) {
        let entity_name = &resolved.entity.logical_name;
        let existing = self.snapshot.find_by_logical_name(entity_name);

        for lookup in &resolved.many_to_one {
            let exists = existing
                .is_some_and(|e| e.has_relationship(RelationshipType::ManyToOne, &lookup.schema_name));

            let action = if exists {
                StepAction::Skip(SkipReason::AlreadyExists)
            } else {
                StepAction::Create(vec![Operation::create_one_to_many(
                    lookup.referencing_entity.clone(),
                    payload::one_to_many(lookup, self.locale),
                    self.solution.clone(),
                )])
            };

            self.plan.push(PlannedStep {
                kind: ObjectKind::ManyToOne,
                entity: entity_name.clone(),
                name: lookup.schema_name.clone(),
                action,
                depends_on: self.depends_on([
                    lookup.referencing_entity.as_str(),
                    lookup.referenced_entity.as_str(),
                ]),
                detail: Some(format!(
                    "{} *-> {}",
                    lookup.referenced_entity, lookup.referencing_entity
                )),
            });
        }
    }

    fn intersection(
        &mut self,
        owner: &ResolvedEntity,
        spec: &IntersectionSpec,
        planned: &mut HashSet<String>,
    ) {
        let schema_name = &spec.entity.schema_name;

        let action = if self.snapshot.find_by_schema_name(schema_name).is_some() {
            StepAction::Skip(SkipReason::AlreadyExists)
        } else if self.created.contains(&spec.entity.logical_name) {
            StepAction::Reject(format!(
                "name collides with entity '{}' declared in this run",
                spec.entity.logical_name
            ))
        } else if !planned.insert(schema_name.to_lowercase()) {
            StepAction::Skip(SkipReason::AlreadyPlanned)
        } else {
            let intersection = &spec.entity.logical_name;
            let mut ops = vec![Operation::create_entity(
                intersection.clone(),
                payload::entity(&spec.entity, self.locale),
                self.solution.clone(),
            )];
            ops.extend(spec.lookups.iter().map(|lookup| {
                Operation::create_one_to_many(
                    intersection.clone(),
                    payload::one_to_many(lookup, self.locale),
                    self.solution.clone(),
                )
            }));
            ops.push(Operation::create_key(
                intersection.clone(),
                payload::key(&spec.key, self.locale),
                self.solution.clone(),
            ));
            StepAction::Create(ops)
        };

        let [first, second] = spec.participants();
        self.plan.push(PlannedStep {
            kind: ObjectKind::ManyToMany,
            entity: owner.entity.logical_name.clone(),
            name: schema_name.clone(),
            action,
            depends_on: self.depends_on([first, second]),
            detail: Some(format!("{} *-* {}", first, second)),
        });
    }
}
