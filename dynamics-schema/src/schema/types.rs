//! Field type taxonomy and its mapping to Dataverse attribute shapes

use serde::{Deserialize, Serialize};

/// Maximum length for single-line text columns
pub const TEXT_MAX_LENGTH: u32 = 200;
/// Maximum length for multi-line text columns
pub const MEMO_MAX_LENGTH: u32 = 50_000;
/// Precision used for decimal columns
pub const DECIMAL_PRECISION: u32 = 10;
/// Format used for auto-number columns
pub const AUTO_NUMBER_FORMAT: &str = "{SEQNUM:10}";

/// Abstract field types accepted in a schema description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    String,
    Enum,
    Text,
    RichText,
    Email,
    Phone,
    Url,
    Json,
    Boolean,
    DateTime,
    Integer,
    Long,
    Decimal,
    Binary,
    AutoNumber,
}

impl FieldKind {
    /// Parse a type tag, case-insensitively
    pub fn parse(tag: &str) -> Option<Self> {
        let kind = match tag.trim().to_lowercase().as_str() {
            "string" => Self::String,
            "enum" => Self::Enum,
            "text" => Self::Text,
            "richtext" => Self::RichText,
            "email" => Self::Email,
            "phone" => Self::Phone,
            "url" => Self::Url,
            "json" => Self::Json,
            "boolean" => Self::Boolean,
            "datetime" => Self::DateTime,
            "integer" => Self::Integer,
            "long" => Self::Long,
            "decimal" => Self::Decimal,
            "binary" => Self::Binary,
            "auto number" => Self::AutoNumber,
            _ => return None,
        };
        Some(kind)
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Enum => "enum",
            Self::Text => "text",
            Self::RichText => "richtext",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Url => "url",
            Self::Json => "json",
            Self::Boolean => "boolean",
            Self::DateTime => "datetime",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Decimal => "decimal",
            Self::Binary => "binary",
            Self::AutoNumber => "auto number",
        }
    }
}

/// Attribute requirement level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequiredLevel {
    None,
    SystemRequired,
}

impl RequiredLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::SystemRequired => "SystemRequired",
        }
    }
}

/// Single-line text formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StringFormat {
    Text,
    Email,
    Phone,
    Url,
    Json,
}

impl StringFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Email => "Email",
            Self::Phone => "Phone",
            Self::Url => "Url",
            Self::Json => "Json",
        }
    }
}

/// Multi-line text formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoFormat {
    TextArea,
    RichText,
}

impl MemoFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextArea => "TextArea",
            Self::RichText => "RichText",
        }
    }
}

/// One labeled value of an option set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionValue {
    pub value: i32,
    pub label: String,
}

/// Concrete attribute shape, one per Dataverse attribute metadata type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldShape {
    Text {
        format: StringFormat,
        max_length: u32,
    },
    Memo {
        format: MemoFormat,
        max_length: u32,
    },
    TwoOptions {
        true_option: OptionValue,
        false_option: OptionValue,
    },
    DateTime,
    WholeNumber,
    BigInt,
    Decimal {
        precision: u32,
    },
    File,
    AutoNumber {
        format: String,
    },
}

impl FieldShape {
    /// Shape for an abstract kind. Total over [`FieldKind`].
    pub fn for_kind(kind: FieldKind) -> Self {
        match kind {
            FieldKind::String | FieldKind::Enum => Self::Text {
                format: StringFormat::Text,
                max_length: TEXT_MAX_LENGTH,
            },
            FieldKind::Text => Self::Memo {
                format: MemoFormat::TextArea,
                max_length: MEMO_MAX_LENGTH,
            },
            FieldKind::RichText => Self::Memo {
                format: MemoFormat::RichText,
                max_length: MEMO_MAX_LENGTH,
            },
            FieldKind::Email => Self::text_with(StringFormat::Email),
            FieldKind::Phone => Self::text_with(StringFormat::Phone),
            FieldKind::Url => Self::text_with(StringFormat::Url),
            FieldKind::Json => Self::text_with(StringFormat::Json),
            FieldKind::Boolean => Self::TwoOptions {
                true_option: OptionValue {
                    value: 1,
                    label: "True".to_string(),
                },
                false_option: OptionValue {
                    value: 0,
                    label: "False".to_string(),
                },
            },
            FieldKind::DateTime => Self::DateTime,
            FieldKind::Integer => Self::WholeNumber,
            FieldKind::Long => Self::BigInt,
            FieldKind::Decimal => Self::Decimal {
                precision: DECIMAL_PRECISION,
            },
            FieldKind::Binary => Self::File,
            FieldKind::AutoNumber => Self::AutoNumber {
                format: AUTO_NUMBER_FORMAT.to_string(),
            },
        }
    }

    fn text_with(format: StringFormat) -> Self {
        Self::Text {
            format,
            max_length: TEXT_MAX_LENGTH,
        }
    }
}

/// A fully derived attribute, ready to be rendered into a create request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub schema_name: String,
    pub logical_name: String,
    pub display_name: String,
    pub description: String,
    pub kind: FieldKind,
    pub shape: FieldShape,
    pub required_level: RequiredLevel,
}

impl FieldSpec {
    pub fn max_length(&self) -> Option<u32> {
        match &self.shape {
            FieldShape::Text { max_length, .. } | FieldShape::Memo { max_length, .. } => {
                Some(*max_length)
            }
            _ => None,
        }
    }

    pub fn precision(&self) -> Option<u32> {
        match &self.shape {
            FieldShape::Decimal { precision } => Some(*precision),
            _ => None,
        }
    }

    pub fn options(&self) -> Vec<&OptionValue> {
        match &self.shape {
            FieldShape::TwoOptions {
                true_option,
                false_option,
            } => vec![true_option, false_option],
            _ => Vec::new(),
        }
    }

    pub fn is_auto_number(&self) -> bool {
        matches!(self.shape, FieldShape::AutoNumber { .. })
    }
}

/// Raised when a member's type tag is not part of the taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnknownTypeError {
    pub entity: String,
    pub field: String,
    pub tag: String,
}

impl std::fmt::Display for UnknownTypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Entity: {}, Member: {} - data type '{}' does not exist",
            self.entity, self.field, self.tag
        )
    }
}

impl std::error::Error for UnknownTypeError {}

/// Map a known kind to a field spec. Always optional; callers promote the
/// primary field to system-required.
pub fn map_type(
    kind: FieldKind,
    schema_name: &str,
    logical_name: &str,
    display_name: &str,
    description: &str,
) -> FieldSpec {
    FieldSpec {
        schema_name: schema_name.to_string(),
        logical_name: logical_name.to_string(),
        display_name: display_name.to_string(),
        description: description.to_string(),
        kind,
        shape: FieldShape::for_kind(kind),
        required_level: RequiredLevel::None,
    }
}

/// Map a raw type tag owned by `entity.field` to a field spec
pub fn map_type_tag(
    entity: &str,
    field: &str,
    tag: &str,
    schema_name: &str,
    logical_name: &str,
    display_name: &str,
    description: &str,
) -> Result<FieldSpec, UnknownTypeError> {
    let kind = FieldKind::parse(tag).ok_or_else(|| UnknownTypeError {
        entity: entity.to_string(),
        field: field.to_string(),
        tag: tag.to_string(),
    })?;

    Ok(map_type(kind, schema_name, logical_name, display_name, description))
}
