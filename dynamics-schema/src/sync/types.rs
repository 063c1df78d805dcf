//! Core data types for schema sync runs

use serde::{Deserialize, Serialize};

/// Kind of schema object, which is also the phase it is processed in
///
/// Variants are declared in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Entity,
    Attribute,
    Key,
    ManyToOne,
    ManyToMany,
}

impl ObjectKind {
    /// All kinds in execution order
    pub fn all() -> &'static [ObjectKind] {
        &[
            ObjectKind::Entity,
            ObjectKind::Attribute,
            ObjectKind::Key,
            ObjectKind::ManyToOne,
            ObjectKind::ManyToMany,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Entity => "entity",
            Self::Attribute => "attribute",
            Self::Key => "key",
            Self::ManyToOne => "many-to-one relationship",
            Self::ManyToMany => "many-to-many relationship",
        }
    }

    pub fn phase_label(&self) -> &'static str {
        match self {
            Self::Entity => "Entities",
            Self::Attribute => "Attributes",
            Self::Key => "Keys",
            Self::ManyToOne => "Many-to-one relationships",
            Self::ManyToMany => "Many-to-many relationships",
        }
    }
}

/// Why an object was not created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Present in the snapshot taken at the start of the run
    AlreadyExists,
    /// Declared again later in the same description
    AlreadyPlanned,
}

impl SkipReason {
    pub fn label(&self) -> &'static str {
        match self {
            Self::AlreadyExists => "already exists",
            Self::AlreadyPlanned => "already declared in this run",
        }
    }
}

/// Outcome for a single schema object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    Created,
    Skipped { reason: SkipReason },
    Failed { error: String },
}

impl SyncOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Created => "+",
            Self::Skipped { .. } => "=",
            Self::Failed { .. } => "×",
        }
    }
}

/// One entry of the status stream emitted while a plan executes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncEvent {
    pub kind: ObjectKind,
    /// Logical name of the owning entity
    pub entity: String,
    /// Schema name of the object
    pub name: String,
    pub outcome: SyncOutcome,
    /// Extra context, e.g. the entities a relationship connects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
