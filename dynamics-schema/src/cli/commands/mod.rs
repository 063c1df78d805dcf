pub mod plan;
pub mod sync;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{Config, ConfigOverrides};
use crate::schema::{EntityDefinition, load};

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Colored, human-readable
    #[default]
    Text,
    /// Single JSON document at the end of the run
    Json,
}

/// Options shared by every command that derives names
#[derive(Args, Debug, Clone, Default)]
pub struct NamingArgs {
    /// Publisher prefix (empty string disables prefixing)
    #[arg(long)]
    pub prefix: Option<String>,

    /// Label language code (1033 or 2057)
    #[arg(long)]
    pub locale: Option<u32>,

    /// Description applied to every created object
    #[arg(long)]
    pub description: Option<String>,

    /// Solution unique name that receives created objects
    #[arg(long)]
    pub solution: Option<String>,

    /// Report members with unknown types as failed instead of aborting
    #[arg(long)]
    pub lenient: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl NamingArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            prefix: self.prefix.clone(),
            locale: self.locale,
            description: self.description.clone(),
            solution: self.solution.clone(),
            lenient: self.lenient,
            ..Default::default()
        }
    }
}

/// Config file, then environment, then flags
fn load_config(naming: &NamingArgs, url: Option<String>, token: Option<String>) -> Result<Config> {
    let mut config = Config::load(naming.config.as_deref())?;
    config.apply_env();
    config.apply_overrides(ConfigOverrides {
        url,
        token,
        ..naming.overrides()
    })?;
    Ok(config)
}

fn read_definitions(file_path: &Path) -> Result<Vec<EntityDefinition>> {
    if !file_path.exists() {
        anyhow::bail!("Schema file does not exist: {}", file_path.display());
    }

    let content = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read schema file: {}", file_path.display()))?;

    let definitions = load(&content)
        .with_context(|| format!("Invalid schema file: {}", file_path.display()))?;
    log::info!(
        "Loaded {} entity definitions from {}",
        definitions.len(),
        file_path.display()
    );
    Ok(definitions)
}
