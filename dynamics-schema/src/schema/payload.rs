//! Dataverse Web API metadata payloads
//!
//! Renders resolved specs into the JSON bodies accepted by the
//! `EntityDefinitions` and `RelationshipDefinitions` endpoints.

use serde_json::{Value, json};

use super::resolve::{EntitySpec, KeySpec, LookupSpec};
use super::types::{FieldShape, FieldSpec, RequiredLevel};

/// Order of the relationship in the associated-records navigation pane
const ASSOCIATED_MENU_ORDER: u32 = 10000;

/// A `Label` with a single localized label
pub fn label(text: &str, locale: u32) -> Value {
    json!({
        "@odata.type": "Microsoft.Dynamics.CRM.Label",
        "LocalizedLabels": [{
            "@odata.type": "Microsoft.Dynamics.CRM.LocalizedLabel",
            "Label": text,
            "LanguageCode": locale
        }]
    })
}

fn required_level(level: RequiredLevel) -> Value {
    json!({
        "Value": level.as_str(),
        "CanBeChanged": true,
        "ManagedPropertyLogicalName": "canmodifyrequirementlevelsettings"
    })
}

/// Attribute metadata body for `POST EntityDefinitions(...)/Attributes`
pub fn attribute(spec: &FieldSpec, locale: u32) -> Value {
    let mut body = json!({
        "SchemaName": spec.schema_name,
        "LogicalName": spec.logical_name,
        "DisplayName": label(&spec.display_name, locale),
        "Description": label(&spec.description, locale),
        "RequiredLevel": required_level(spec.required_level),
    });

    let typed = match &spec.shape {
        FieldShape::Text { format, max_length } => json!({
            "@odata.type": "Microsoft.Dynamics.CRM.StringAttributeMetadata",
            "AttributeType": "String",
            "AttributeTypeName": { "Value": "StringType" },
            "FormatName": { "Value": format.as_str() },
            "MaxLength": max_length
        }),
        FieldShape::Memo { format, max_length } => json!({
            "@odata.type": "Microsoft.Dynamics.CRM.MemoAttributeMetadata",
            "AttributeType": "Memo",
            "AttributeTypeName": { "Value": "MemoType" },
            "Format": format.as_str(),
            "MaxLength": max_length
        }),
        FieldShape::TwoOptions {
            true_option,
            false_option,
        } => json!({
            "@odata.type": "Microsoft.Dynamics.CRM.BooleanAttributeMetadata",
            "AttributeType": "Boolean",
            "AttributeTypeName": { "Value": "BooleanType" },
            "OptionSet": {
                "@odata.type": "Microsoft.Dynamics.CRM.BooleanOptionSetMetadata",
                "OptionSetType": "Boolean",
                "TrueOption": {
                    "Value": true_option.value,
                    "Label": label(&true_option.label, locale)
                },
                "FalseOption": {
                    "Value": false_option.value,
                    "Label": label(&false_option.label, locale)
                }
            }
        }),
        FieldShape::DateTime => json!({
            "@odata.type": "Microsoft.Dynamics.CRM.DateTimeAttributeMetadata",
            "AttributeType": "DateTime",
            "AttributeTypeName": { "Value": "DateTimeType" },
            "Format": "DateAndTime",
            "ImeMode": "Auto"
        }),
        FieldShape::WholeNumber => json!({
            "@odata.type": "Microsoft.Dynamics.CRM.IntegerAttributeMetadata",
            "AttributeType": "Integer",
            "AttributeTypeName": { "Value": "IntegerType" },
            "Format": "None"
        }),
        FieldShape::BigInt => json!({
            "@odata.type": "Microsoft.Dynamics.CRM.BigIntAttributeMetadata",
            "AttributeType": "BigInt",
            "AttributeTypeName": { "Value": "BigIntType" }
        }),
        FieldShape::Decimal { precision } => json!({
            "@odata.type": "Microsoft.Dynamics.CRM.DecimalAttributeMetadata",
            "AttributeType": "Decimal",
            "AttributeTypeName": { "Value": "DecimalType" },
            "Precision": precision
        }),
        FieldShape::File => json!({
            "@odata.type": "Microsoft.Dynamics.CRM.FileAttributeMetadata",
            "AttributeTypeName": { "Value": "FileType" }
        }),
        // Dataverse only generates sequence values into string columns
        FieldShape::AutoNumber { format } => json!({
            "@odata.type": "Microsoft.Dynamics.CRM.StringAttributeMetadata",
            "AttributeType": "String",
            "AttributeTypeName": { "Value": "StringType" },
            "FormatName": { "Value": "Text" },
            "AutoNumberFormat": format,
            "MaxLength": 100
        }),
    };

    merge(&mut body, typed);
    body
}

/// Primary name attribute, embedded in the entity body
fn primary_attribute(spec: &FieldSpec, locale: u32) -> Value {
    let mut body = attribute(spec, locale);
    body["IsPrimaryName"] = json!(true);
    body
}

/// Entity metadata body for `POST EntityDefinitions`
pub fn entity(spec: &EntitySpec, locale: u32) -> Value {
    json!({
        "@odata.type": "Microsoft.Dynamics.CRM.EntityMetadata",
        "SchemaName": spec.schema_name,
        "LogicalName": spec.logical_name,
        "LogicalCollectionName": spec.logical_collection_name,
        "DisplayName": label(&spec.display_name, locale),
        "DisplayCollectionName": label(&spec.display_collection_name, locale),
        "Description": label(&spec.description, locale),
        "OwnershipType": "UserOwned",
        "IsActivity": false,
        "HasActivities": false,
        "HasNotes": false,
        "HasFeedback": false,
        "Attributes": [primary_attribute(&spec.primary_attribute, locale)]
    })
}

/// Key metadata body for `POST EntityDefinitions(...)/Keys`
pub fn key(spec: &KeySpec, locale: u32) -> Value {
    json!({
        "@odata.type": "Microsoft.Dynamics.CRM.EntityKeyMetadata",
        "SchemaName": spec.schema_name,
        "LogicalName": spec.logical_name,
        "DisplayName": label(&spec.display_name, locale),
        "KeyAttributes": spec.key_attributes,
        "IsSecondaryKey": false
    })
}

fn associated_menu(display_name: &str, locale: u32) -> Value {
    json!({
        "Behavior": "UseLabel",
        "Group": "Details",
        "Label": label(display_name, locale),
        "Order": ASSOCIATED_MENU_ORDER
    })
}

/// One-to-many relationship body (with its lookup) for `POST RelationshipDefinitions`
///
/// Deleting the referenced record only clears the lookup; nothing else cascades.
pub fn one_to_many(spec: &LookupSpec, locale: u32) -> Value {
    json!({
        "@odata.type": "Microsoft.Dynamics.CRM.OneToManyRelationshipMetadata",
        "SchemaName": spec.schema_name,
        "ReferencedEntity": spec.referenced_entity,
        "ReferencingEntity": spec.referencing_entity,
        "AssociatedMenuConfiguration": associated_menu(&spec.display_name, locale),
        "CascadeConfiguration": {
            "Assign": "NoCascade",
            "Delete": "RemoveLink",
            "Merge": "NoCascade",
            "Reparent": "NoCascade",
            "Share": "NoCascade",
            "Unshare": "NoCascade"
        },
        "Lookup": {
            "@odata.type": "Microsoft.Dynamics.CRM.LookupAttributeMetadata",
            "AttributeType": "Lookup",
            "AttributeTypeName": { "Value": "LookupType" },
            "SchemaName": spec.schema_name,
            "LogicalName": spec.logical_name,
            "DisplayName": label(&spec.display_name, locale),
            "Description": label(&spec.description, locale),
            "RequiredLevel": required_level(RequiredLevel::None)
        }
    })
}

fn merge(target: &mut Value, extra: Value) {
    if let (Value::Object(target), Value::Object(extra)) = (target, extra) {
        for (key, value) in extra {
            target.insert(key, value);
        }
    }
}
