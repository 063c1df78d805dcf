//! Name derivation for Dataverse schema objects
//!
//! Every schema object created by a sync run gets its names from the
//! functions in this module. The same functions are used when matching
//! against the live snapshot, so a name derived for a create request and a
//! name looked up in the snapshot always agree.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PREFIX: &str = "OAP";
pub const DEFAULT_DESCRIPTION: &str = "Imported from the Ops App.";
pub const DEFAULT_SOLUTION: &str = "OAP";

/// English (United States)
pub const LOCALE_EN_US: u32 = 1033;
/// English (United Kingdom)
pub const LOCALE_EN_GB: u32 = 2057;
pub const SUPPORTED_LOCALES: [u32; 2] = [LOCALE_EN_US, LOCALE_EN_GB];

/// Immutable naming configuration for a single sync run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingContext {
    /// Publisher prefix prepended to every derived name (empty disables prefixing)
    pub prefix: String,
    /// Language code used on every label
    pub locale: u32,
    /// Description label applied to every created object
    pub description: String,
    /// Solution that receives every created object
    pub solution_unique_name: String,
}

impl Default for NamingContext {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            locale: LOCALE_EN_US,
            description: DEFAULT_DESCRIPTION.to_string(),
            solution_unique_name: DEFAULT_SOLUTION.to_string(),
        }
    }
}

impl NamingContext {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Default::default()
        }
    }

    pub fn schema_name(&self, name: &str) -> Result<String, NamingError> {
        schema_name(&self.prefix, name)
    }

    pub fn logical_name(&self, name: &str) -> Result<String, NamingError> {
        logical_name(&self.prefix, name)
    }

    pub fn logical_collection_name(&self, name: &str) -> Result<String, NamingError> {
        logical_collection_name(&self.prefix, name)
    }
}

/// Error raised for names that cannot be normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamingError {
    /// The raw name was empty
    EmptyName,
}

impl std::fmt::Display for NamingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NamingError::EmptyName => write!(f, "name cannot be empty"),
        }
    }
}

impl std::error::Error for NamingError {}

/// Join `prefix` and `name` with an underscore, or return `name` when the
/// prefix is blank
pub fn add_prefix(prefix: &str, name: &str) -> Result<String, NamingError> {
    if name.is_empty() {
        return Err(NamingError::EmptyName);
    }

    if prefix.trim().is_empty() {
        return Ok(name.to_string());
    }

    Ok(format!("{}_{}", prefix, name))
}

/// Schema name: prefixed, dots stripped, lower-cased
///
/// `schema_name("OAP", "Country.Image") == "oap_countryimage"`
pub fn schema_name(prefix: &str, name: &str) -> Result<String, NamingError> {
    Ok(add_prefix(prefix, name)?.replace('.', "").to_lowercase())
}

/// Logical name. Derived exactly like [`schema_name`].
pub fn logical_name(prefix: &str, name: &str) -> Result<String, NamingError> {
    schema_name(prefix, name)
}

/// Entity set name used in Web API URLs (naive `s` plural)
pub fn logical_collection_name(prefix: &str, name: &str) -> Result<String, NamingError> {
    Ok(format!("{}s", logical_name(prefix, name)?).to_lowercase())
}

pub fn display_name(name: &str) -> String {
    name.to_string()
}

/// Plural display label. No irregular plurals.
pub fn display_collection_name(name: &str) -> String {
    format!("{}s", name)
}
