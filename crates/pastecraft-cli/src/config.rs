//! CLI configuration

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which script engine runs executable-transform rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Rhai scripts
    #[default]
    Rhai,
    /// `sh -c` commands
    Shell,
}

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Settings file holding the rule list
    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,

    /// Script engine for transform rules
    #[serde(default)]
    pub engine: EngineKind,

    /// Shell binary used by the shell engine
    #[serde(default = "default_shell")]
    pub shell: PathBuf,
}

impl CliConfig {
    /// Load configuration from file and CLI overrides
    pub(crate) fn load(config_path: &str, cli: &crate::Cli) -> anyhow::Result<Self> {
        let mut config = Self::from_file(config_path)?;

        // Apply CLI overrides
        if let Some(settings) = &cli.settings {
            config.settings_path = settings.clone();
        }

        if let Some(engine) = cli.engine {
            config.engine = engine;
        }

        Ok(config)
    }

    /// Read the YAML file, or use defaults when it does not exist
    pub fn from_file(config_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = config_path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            settings_path: default_settings_path(),
            engine: EngineKind::default(),
            shell: default_shell(),
        }
    }
}

fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pastecraft")
        .join("settings.json")
}

fn default_shell() -> PathBuf {
    PathBuf::from("sh")
}
