//! Declarative schema model
//!
//! Loading, naming, type mapping and resolution of entity definitions,
//! plus rendering of the resolved specs into Web API metadata payloads.

pub mod model;
pub mod naming;
pub mod payload;
pub mod resolve;
pub mod types;

pub use model::{EntityDefinition, LoadError, Member, RelationshipRef, load};
pub use naming::{NamingContext, NamingError};
pub use resolve::{
    AttributeDecl, EntitySpec, IntersectionSpec, KeySpec, LookupSpec, ResolvedEntity,
    SchemaError, TypePolicy, resolve_all, resolve_entity,
};
pub use types::{FieldKind, FieldShape, FieldSpec, RequiredLevel, UnknownTypeError, map_type};
