//! Layered configuration
//!
//! Built-in defaults, then the TOML config file, then `DYNAMICS_*`
//! environment variables, then command line flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::api::client::DEFAULT_API_VERSION;
use crate::schema::naming::{
    DEFAULT_DESCRIPTION, DEFAULT_PREFIX, DEFAULT_SOLUTION, LOCALE_EN_US, NamingContext,
    SUPPORTED_LOCALES,
};
use crate::schema::resolve::TypePolicy;

pub const APP_NAME: &str = "dynamics-schema";
pub const CONFIG_FILE: &str = "config.toml";

pub const ENV_URL: &str = "DYNAMICS_URL";
pub const ENV_TOKEN: &str = "DYNAMICS_TOKEN";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub naming: NamingConfig,
    pub connection: ConnectionConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    pub prefix: String,
    pub locale: u32,
    pub description: String,
    pub solution: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            locale: LOCALE_EN_US,
            description: DEFAULT_DESCRIPTION.to_string(),
            solution: DEFAULT_SOLUTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Environment URL, e.g. `https://org.crm4.dynamics.com`
    pub url: Option<String>,
    pub token: Option<String>,
    pub api_version: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub type_policy: TypePolicy,
}

/// Values given on the command line; `None` keeps the configured value
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub prefix: Option<String>,
    pub locale: Option<u32>,
    pub description: Option<String>,
    pub solution: Option<String>,
    pub url: Option<String>,
    pub token: Option<String>,
    pub lenient: bool,
}

/// `{config_dir}/dynamics-schema/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
}

impl Config {
    /// Load from `path`, or from the default location when it exists
    ///
    /// An explicitly given path must exist; a missing default file just
    /// means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => {
                    log::debug!("No config file, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Self::from_toml(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `DYNAMICS_URL` / `DYNAMICS_TOKEN` from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_URL).filter(|v| !v.trim().is_empty()) {
            self.connection.url = Some(url);
        }
        if let Some(token) = lookup(ENV_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.connection.token = Some(token);
        }
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) -> Result<()> {
        if let Some(prefix) = overrides.prefix {
            self.naming.prefix = prefix;
        }
        if let Some(locale) = overrides.locale {
            self.naming.locale = locale;
        }
        if let Some(description) = overrides.description {
            self.naming.description = description;
        }
        if let Some(solution) = overrides.solution {
            self.naming.solution = solution;
        }
        if let Some(url) = overrides.url {
            self.connection.url = Some(url);
        }
        if let Some(token) = overrides.token {
            self.connection.token = Some(token);
        }
        if overrides.lenient {
            self.sync.type_policy = TypePolicy::Lenient;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_LOCALES.contains(&self.naming.locale) {
            anyhow::bail!(
                "Unsupported locale {}. Supported locales: {}",
                self.naming.locale,
                SUPPORTED_LOCALES
                    .iter()
                    .map(|l| l.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        if self.naming.solution.trim().is_empty() {
            anyhow::bail!("Solution unique name cannot be empty");
        }
        Ok(())
    }

    pub fn naming_context(&self) -> NamingContext {
        NamingContext {
            prefix: self.naming.prefix.clone(),
            locale: self.naming.locale,
            description: self.naming.description.clone(),
            solution_unique_name: self.naming.solution.clone(),
        }
    }

    /// URL and token, or an error naming whichever is missing
    pub fn credentials(&self) -> Result<(&str, &str)> {
        let url = self
            .connection
            .url
            .as_deref()
            .with_context(|| format!("No environment URL. Set {} or pass --url", ENV_URL))?;
        let token = self
            .connection
            .token
            .as_deref()
            .with_context(|| format!("No access token. Set {} or pass --token", ENV_TOKEN))?;
        Ok((url, token))
    }
}
