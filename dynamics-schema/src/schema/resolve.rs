//! Resolution of entity definitions into fully named schema objects
//!
//! Resolution runs before the service is contacted. Everything that can be
//! decided locally (names, attribute shapes, primary-field rules, unknown
//! type tags) is decided here, so malformed input never reaches the service.

use serde::{Deserialize, Serialize};

use super::model::{EntityDefinition, Member};
use super::naming::{self, NamingContext, NamingError};
use super::types::{FieldKind, FieldSpec, RequiredLevel, UnknownTypeError, map_type, map_type_tag};

/// Raw name of the primary field on intersection entities
pub const INTERSECTION_PRIMARY_FIELD: &str = "Name";
/// Raw name of the composite key on intersection entities
pub const INTERSECTION_KEY_NAME: &str = "RelationshipID";

/// How members with an unrecognized type tag are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypePolicy {
    /// Abort the run before anything is sent to the service
    #[default]
    Strict,
    /// Report the attribute as failed and continue
    Lenient,
}

/// Entity-level metadata plus its primary attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpec {
    pub schema_name: String,
    pub logical_name: String,
    pub logical_collection_name: String,
    pub display_name: String,
    pub display_collection_name: String,
    pub description: String,
    pub primary_attribute: FieldSpec,
}

/// An alternate key over one or more attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySpec {
    pub schema_name: String,
    pub logical_name: String,
    pub display_name: String,
    /// Logical name of the owning entity
    pub entity_logical_name: String,
    /// Logical names of the key attributes
    pub key_attributes: Vec<String>,
}

/// A lookup column plus the one-to-many relationship backing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupSpec {
    pub schema_name: String,
    pub logical_name: String,
    pub display_name: String,
    pub description: String,
    /// The "one" side
    pub referenced_entity: String,
    /// The "many" side, which receives the lookup column
    pub referencing_entity: String,
}

/// Many-to-many relationship realized as its own entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntersectionSpec {
    pub entity: EntitySpec,
    pub lookups: [LookupSpec; 2],
    pub key: KeySpec,
}

impl IntersectionSpec {
    /// Logical names of both participating entities
    pub fn participants(&self) -> [&str; 2] {
        [
            self.lookups[0].referenced_entity.as_str(),
            self.lookups[1].referenced_entity.as_str(),
        ]
    }
}

/// A non-primary member after type mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeDecl {
    Mapped(FieldSpec),
    /// Unknown type tag, kept only under [`TypePolicy::Lenient`]
    Unmapped {
        schema_name: String,
        error: UnknownTypeError,
    },
}

impl AttributeDecl {
    pub fn schema_name(&self) -> &str {
        match self {
            Self::Mapped(spec) => &spec.schema_name,
            Self::Unmapped { schema_name, .. } => schema_name,
        }
    }
}

/// An entity definition with every derived name and shape filled in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntity {
    /// Raw name from the description
    pub name: String,
    pub entity: EntitySpec,
    pub attributes: Vec<AttributeDecl>,
    pub key: Option<KeySpec>,
    pub many_to_one: Vec<LookupSpec>,
    pub many_to_many: Vec<IntersectionSpec>,
}

/// Error resolving a definition set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A name could not be normalized
    InvalidName {
        entity: String,
        context: String,
        source: NamingError,
    },
    /// The first member is not a string field
    InvalidPrimaryField {
        entity: String,
        field: String,
        tag: String,
    },
    UnknownType(UnknownTypeError),
}

impl std::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaError::InvalidName {
                entity,
                context,
                source,
            } => write!(f, "Entity: {}, {} - {}", entity, context, source),
            SchemaError::InvalidPrimaryField { entity, field, tag } => write!(
                f,
                "Entity: {}, Member: {} - invalid type '{}'. Primary attribute has to be a string",
                entity, field, tag
            ),
            SchemaError::UnknownType(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for SchemaError {}

impl From<UnknownTypeError> for SchemaError {
    fn from(err: UnknownTypeError) -> Self {
        SchemaError::UnknownType(err)
    }
}

/// Resolve every definition. Stops at the first error.
pub fn resolve_all(
    definitions: &[EntityDefinition],
    ctx: &NamingContext,
    policy: TypePolicy,
) -> Result<Vec<ResolvedEntity>, SchemaError> {
    definitions
        .iter()
        .map(|definition| resolve_entity(definition, ctx, policy))
        .collect()
}

pub fn resolve_entity(
    definition: &EntityDefinition,
    ctx: &NamingContext,
    policy: TypePolicy,
) -> Result<ResolvedEntity, SchemaError> {
    let entity_name = definition.name.as_str();
    let resolver = Resolver { ctx, entity_name };

    let primary_attribute = resolver.primary_attribute(&definition.primary_field)?;
    let entity = resolver.entity_spec(entity_name, primary_attribute)?;

    let mut attributes = Vec::with_capacity(definition.fields.len());
    for member in &definition.fields {
        match resolver.attribute(member) {
            Ok(spec) => attributes.push(AttributeDecl::Mapped(spec)),
            Err(SchemaError::UnknownType(error)) if policy == TypePolicy::Lenient => {
                log::warn!("{}", error);
                attributes.push(AttributeDecl::Unmapped {
                    schema_name: resolver.name(&member.name, "member", naming::schema_name)?,
                    error,
                });
            }
            Err(err) => return Err(err),
        }
    }

    let key = definition
        .key_field()
        .map(|field| resolver.key(entity_name, field, &[field]))
        .transpose()?;

    let many_to_one = definition
        .many_to_one
        .iter()
        .map(|rel| resolver.lookup(&rel.target, entity_name, &rel.name))
        .collect::<Result<Vec<_>, _>>()?;

    let many_to_many = definition
        .many_to_many
        .iter()
        .map(|rel| resolver.intersection(&rel.name, &rel.target))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ResolvedEntity {
        name: definition.name.clone(),
        entity,
        attributes,
        key,
        many_to_one,
        many_to_many,
    })
}

struct Resolver<'a> {
    ctx: &'a NamingContext,
    entity_name: &'a str,
}

impl Resolver<'_> {
    fn name(
        &self,
        raw: &str,
        context: &str,
        derive: fn(&str, &str) -> Result<String, NamingError>,
    ) -> Result<String, SchemaError> {
        derive(&self.ctx.prefix, raw).map_err(|source| SchemaError::InvalidName {
            entity: self.entity_name.to_string(),
            context: format!("{} '{}'", context, raw),
            source,
        })
    }

    fn field(&self, kind: FieldKind, raw_name: &str) -> Result<FieldSpec, SchemaError> {
        Ok(map_type(
            kind,
            &self.name(raw_name, "member", naming::schema_name)?,
            &self.name(raw_name, "member", naming::logical_name)?,
            &naming::display_name(raw_name),
            &self.ctx.description,
        ))
    }

    fn primary_attribute(&self, member: &Member) -> Result<FieldSpec, SchemaError> {
        if FieldKind::parse(&member.type_tag) != Some(FieldKind::String) {
            return Err(SchemaError::InvalidPrimaryField {
                entity: self.entity_name.to_string(),
                field: member.name.clone(),
                tag: member.type_tag.clone(),
            });
        }

        let mut spec = self.field(FieldKind::String, &member.name)?;
        spec.required_level = RequiredLevel::SystemRequired;
        Ok(spec)
    }

    fn attribute(&self, member: &Member) -> Result<FieldSpec, SchemaError> {
        Ok(map_type_tag(
            self.entity_name,
            &member.name,
            &member.type_tag,
            &self.name(&member.name, "member", naming::schema_name)?,
            &self.name(&member.name, "member", naming::logical_name)?,
            &naming::display_name(&member.name),
            &self.ctx.description,
        )?)
    }

    fn entity_spec(
        &self,
        raw_name: &str,
        primary_attribute: FieldSpec,
    ) -> Result<EntitySpec, SchemaError> {
        Ok(EntitySpec {
            schema_name: self.name(raw_name, "entity", naming::schema_name)?,
            logical_name: self.name(raw_name, "entity", naming::logical_name)?,
            logical_collection_name: self.name(
                raw_name,
                "entity",
                naming::logical_collection_name,
            )?,
            display_name: naming::display_name(raw_name),
            display_collection_name: naming::display_collection_name(raw_name),
            description: self.ctx.description.clone(),
            primary_attribute,
        })
    }

    fn key(&self, entity: &str, key_name: &str, fields: &[&str]) -> Result<KeySpec, SchemaError> {
        let key_attributes = fields
            .iter()
            .map(|field| self.name(field, "key attribute", naming::logical_name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(KeySpec {
            schema_name: self.name(key_name, "key", naming::schema_name)?,
            logical_name: self.name(key_name, "key", naming::logical_name)?,
            display_name: naming::display_name(key_name),
            entity_logical_name: self.name(entity, "entity", naming::logical_name)?,
            key_attributes,
        })
    }

    fn lookup(
        &self,
        referenced: &str,
        referencing: &str,
        relationship: &str,
    ) -> Result<LookupSpec, SchemaError> {
        let context = "relationship";
        Ok(LookupSpec {
            schema_name: self.name(relationship, context, naming::schema_name)?,
            logical_name: self.name(relationship, context, naming::logical_name)?,
            display_name: naming::display_name(relationship),
            description: format!("Lookup to the {} table.", naming::display_name(referenced)),
            referenced_entity: self.name(referenced, context, naming::logical_name)?,
            referencing_entity: self.name(referencing, context, naming::logical_name)?,
        })
    }

    /// Intersection entity named after the relationship, with a lookup to
    /// each participant and a composite key over both lookups
    ///
    /// When an entity relates to itself the second lookup is named
    /// `{relationship}_Related{entity}` so both columns stay distinct.
    fn intersection(&self, relationship: &str, other: &str) -> Result<IntersectionSpec, SchemaError> {
        let to_name = |participant: &str| {
            naming::add_prefix(relationship, participant).map_err(|source| {
                SchemaError::InvalidName {
                    entity: self.entity_name.to_string(),
                    context: format!("relationship '{}'", relationship),
                    source,
                }
            })
        };
        let self_referencing = self.name(self.entity_name, "entity", naming::logical_name)?
            == self.name(other, "relationship", naming::logical_name)?;

        let own_lookup = to_name(self.entity_name)?;
        let other_lookup = if self_referencing {
            to_name(&format!("Related{}", other))?
        } else {
            to_name(other)?
        };

        let mut primary = self.field(FieldKind::String, INTERSECTION_PRIMARY_FIELD)?;
        primary.required_level = RequiredLevel::SystemRequired;

        Ok(IntersectionSpec {
            entity: self.entity_spec(relationship, primary)?,
            lookups: [
                self.lookup(self.entity_name, relationship, &own_lookup)?,
                self.lookup(other, relationship, &other_lookup)?,
            ],
            key: self.key(
                relationship,
                INTERSECTION_KEY_NAME,
                &[own_lookup.as_str(), other_lookup.as_str()],
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::model::load;
    use crate::schema::types::FieldShape;

    fn resolve_json(json: &str, policy: TypePolicy) -> Result<Vec<ResolvedEntity>, SchemaError> {
        resolve_all(&load(json).unwrap(), &NamingContext::default(), policy)
    }

    #[test]
    fn test_country_entity_names() {
        let resolved = resolve_json(
            r#"[{ "Name": "Country", "Members": { "ID": "String", "Active": "Boolean", "Capital": "String" } }]"#,
            TypePolicy::Strict,
        )
        .unwrap();

        let country = &resolved[0];
        assert_eq!(country.entity.schema_name, "oap_country");
        assert_eq!(country.entity.logical_collection_name, "oap_countrys");
        assert_eq!(country.entity.display_collection_name, "Countrys");
        assert_eq!(country.entity.primary_attribute.schema_name, "oap_id");
        assert_eq!(
            country.entity.primary_attribute.required_level,
            RequiredLevel::SystemRequired
        );

        let names: Vec<&str> = country.attributes.iter().map(|a| a.schema_name()).collect();
        assert_eq!(names, vec!["oap_active", "oap_capital"]);
        assert!(country.key.is_none());
        assert!(country.many_to_one.is_empty());
    }

    #[test]
    fn test_non_string_primary_field() {
        let err = resolve_json(
            r#"[{ "Name": "Country", "Members": { "ID": "Integer", "Name": "String" } }]"#,
            TypePolicy::Strict,
        )
        .unwrap_err();

        assert_eq!(
            err,
            SchemaError::InvalidPrimaryField {
                entity: "Country".to_string(),
                field: "ID".to_string(),
                tag: "Integer".to_string(),
            }
        );
    }

    #[test]
    fn test_primary_field_tag_is_case_insensitive() {
        assert!(resolve_json(r#"[{ "Name": "A", "Members": { "ID": "STRING" } }]"#, TypePolicy::Strict).is_ok());
        // "Enum" maps to text but is not a string primary field
        assert!(resolve_json(r#"[{ "Name": "A", "Members": { "ID": "Enum" } }]"#, TypePolicy::Strict).is_err());
    }

    #[test]
    fn test_unknown_type_strict() {
        let err = resolve_json(
            r#"[{ "Name": "A", "Members": { "ID": "String", "Photo": "Picture" } }]"#,
            TypePolicy::Strict,
        )
        .unwrap_err();

        match err {
            SchemaError::UnknownType(err) => {
                assert_eq!(err.entity, "A");
                assert_eq!(err.field, "Photo");
                assert_eq!(err.tag, "Picture");
            }
            other => panic!("expected UnknownType, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_lenient() {
        let resolved = resolve_json(
            r#"[{ "Name": "A", "Members": { "ID": "String", "Photo": "Picture", "Size": "Long" } }]"#,
            TypePolicy::Lenient,
        )
        .unwrap();

        let attributes = &resolved[0].attributes;
        assert_eq!(attributes.len(), 2);
        assert!(matches!(&attributes[0], AttributeDecl::Unmapped { schema_name, .. } if schema_name == "oap_photo"));
        assert!(matches!(&attributes[1], AttributeDecl::Mapped(spec) if spec.shape == FieldShape::BigInt));
    }

    #[test]
    fn test_key_spec() {
        let resolved = resolve_json(
            r#"[{ "Name": "Country", "PrimaryKey": "ISO.Code", "Members": { "ID": "String", "ISO.Code": "String" } }]"#,
            TypePolicy::Strict,
        )
        .unwrap();

        let key = resolved[0].key.as_ref().unwrap();
        assert_eq!(key.schema_name, "oap_isocode");
        assert_eq!(key.display_name, "ISO.Code");
        assert_eq!(key.entity_logical_name, "oap_country");
        assert_eq!(key.key_attributes, vec!["oap_isocode"]);
    }

    #[test]
    fn test_many_to_one_lookup() {
        let resolved = resolve_json(
            r#"[{ "Name": "City", "Members": { "Name": "String" }, "ManyToOne": { "City_Country": "Country" } }]"#,
            TypePolicy::Strict,
        )
        .unwrap();

        let lookup = &resolved[0].many_to_one[0];
        assert_eq!(lookup.schema_name, "oap_city_country");
        assert_eq!(lookup.referenced_entity, "oap_country");
        assert_eq!(lookup.referencing_entity, "oap_city");
        assert_eq!(lookup.description, "Lookup to the Country table.");
    }

    #[test]
    fn test_many_to_many_intersection() {
        let resolved = resolve_json(
            r#"[
                { "Name": "A", "Members": { "Name": "String" }, "ManyToMany": { "AB_Link": "B" } },
                { "Name": "B", "Members": { "Name": "String" } }
            ]"#,
            TypePolicy::Strict,
        )
        .unwrap();

        let link = &resolved[0].many_to_many[0];
        assert_eq!(link.entity.schema_name, "oap_ab_link");
        assert_eq!(link.entity.primary_attribute.schema_name, "oap_name");
        assert_eq!(link.participants(), ["oap_a", "oap_b"]);
        assert_eq!(link.lookups[0].schema_name, "oap_ab_link_a");
        assert_eq!(link.lookups[1].schema_name, "oap_ab_link_b");
        assert!(link.lookups.iter().all(|l| l.referencing_entity == "oap_ab_link"));
        assert_eq!(link.key.schema_name, "oap_relationshipid");
        assert_eq!(link.key.entity_logical_name, "oap_ab_link");
        assert_eq!(link.key.key_attributes, vec!["oap_ab_link_a", "oap_ab_link_b"]);
    }

    #[test]
    fn test_self_referencing_many_to_many() {
        let resolved = resolve_json(
            r#"[{ "Name": "Person", "Members": { "Name": "String" }, "ManyToMany": { "Person_Friend": "Person" } }]"#,
            TypePolicy::Strict,
        )
        .unwrap();

        let link = &resolved[0].many_to_many[0];
        assert_eq!(link.entity.schema_name, "oap_person_friend");
        assert_eq!(link.participants(), ["oap_person", "oap_person"]);
        assert_eq!(link.lookups[0].schema_name, "oap_person_friend_person");
        assert_eq!(link.lookups[1].schema_name, "oap_person_friend_relatedperson");
        assert_eq!(
            link.key.key_attributes,
            vec!["oap_person_friend_person", "oap_person_friend_relatedperson"]
        );
    }

    #[test]
    fn test_self_reference_detected_by_logical_name() {
        let resolved = resolve_json(
            r#"[{ "Name": "Per.son", "Members": { "Name": "String" }, "ManyToMany": { "Link": "PERSON" } }]"#,
            TypePolicy::Strict,
        )
        .unwrap();

        let link = &resolved[0].many_to_many[0];
        assert_ne!(link.lookups[0].logical_name, link.lookups[1].logical_name);
    }

    #[test]
    fn test_empty_member_name() {
        let err = resolve_json(
            r#"[{ "Name": "A", "Members": { "ID": "String", "": "Long" } }]"#,
            TypePolicy::Strict,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidName { source: NamingError::EmptyName, .. }));
    }
}
