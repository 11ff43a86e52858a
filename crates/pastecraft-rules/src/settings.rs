//! Settings model, legacy migration, and the store boundary
//!
//! The engine only needs an in-memory [`Settings`] value. Loading goes
//! through [`load_settings`], which:
//! - falls back to defaults when nothing is stored
//! - converts the legacy `patterns` / `replacers` shape into rules
//! - turns the transform permission off when no enabled transform rule is left
//! - persists the result whenever one of the steps changed the data

use pastecraft_core::{Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::rule::Rule;

/// Current on-disk format version
pub const SETTINGS_FORMAT_VERSION: u32 = 2;

/// Rule list and global flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Format version marker
    #[serde(default = "current_version")]
    pub version: u32,

    /// Ordered rule list
    #[serde(default)]
    pub rules: Vec<Rule>,

    /// Whether executable-transform rules may be compiled at all
    #[serde(default)]
    pub transform_execution_allowed: bool,

    /// Show the "rules applied" summary after a paste
    #[serde(default = "default_true")]
    pub show_rule_notifications: bool,

    /// Verbose per-rule logging
    #[serde(default)]
    pub debug_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            rules: Vec::new(),
            transform_execution_allowed: false,
            show_rule_notifications: true,
            debug_mode: false,
        }
    }
}

impl Settings {
    /// Settings holding the given rules and default flags
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            ..Self::default()
        }
    }

    /// Builder-style toggle for the transform permission
    pub fn allow_transforms(mut self, allowed: bool) -> Self {
        self.transform_execution_allowed = allowed;
        self
    }

    /// Whether any enabled rule runs user code
    pub fn has_enabled_transform(&self) -> bool {
        self.rules.iter().any(|r| r.enabled && r.is_executable())
    }

    /// Reset the transform permission when nothing would use it.
    ///
    /// Returns true when the flag was changed.
    pub fn downgrade_permission(&mut self) -> bool {
        if self.transform_execution_allowed && !self.has_enabled_transform() {
            self.transform_execution_allowed = false;
            return true;
        }
        false
    }

    /// Interpret stored data, migrating the legacy shape when needed
    pub fn from_value(value: Value) -> Result<LoadedSettings> {
        let Value::Object(map) = &value else {
            return Err(Error::settings("stored settings are not an object"));
        };

        let is_legacy = !map.contains_key("rules")
            && (map.contains_key("patterns") || map.contains_key("replacers"));

        let (mut settings, migrated) = if is_legacy {
            let legacy: LegacySettings = serde_json::from_value(value)?;
            (legacy.migrate(), true)
        } else {
            (serde_json::from_value::<Settings>(value)?, false)
        };

        let downgraded = settings.downgrade_permission();
        if downgraded {
            info!("No enabled transform rules left, disabling transform execution");
        }

        Ok(LoadedSettings {
            settings,
            migrated,
            downgraded,
        })
    }

    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<LoadedSettings> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }
}

/// Settings plus what happened while loading them
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    /// The usable settings
    pub settings: Settings,

    /// Data was converted from the legacy shape
    pub migrated: bool,

    /// The transform permission was switched off
    pub downgraded: bool,
}

impl LoadedSettings {
    /// Whether the loaded data differs from what was stored
    pub fn needs_save(&self) -> bool {
        self.migrated || self.downgraded
    }
}

/// The pre-rules persisted shape: parallel pattern and replacement lists
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacySettings {
    /// Format version marker, absent or 1 in practice
    #[serde(default)]
    pub version: Option<u32>,

    /// Patterns, paired by index with `replacers`
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Replacement templates
    #[serde(default)]
    pub replacers: Vec<String>,
}

impl LegacySettings {
    /// Pair patterns with replacements into static rules.
    ///
    /// Unpaired trailing entries are dropped and transform execution is
    /// always off afterwards.
    pub fn migrate(self) -> Settings {
        let paired = self.patterns.len().min(self.replacers.len());
        if self.patterns.len() != self.replacers.len() {
            warn!(
                patterns = self.patterns.len(),
                replacers = self.replacers.len(),
                "Dropping unpaired legacy entries during migration"
            );
        }

        let rules: Vec<Rule> = self
            .patterns
            .into_iter()
            .zip(self.replacers)
            .map(|(pattern, template)| Rule::static_replace(pattern, template))
            .collect();

        info!(
            from_version = self.version.unwrap_or(1),
            rules = paired,
            "Migrated legacy settings"
        );

        Settings {
            version: SETTINGS_FORMAT_VERSION,
            rules,
            transform_execution_allowed: false,
            ..Settings::default()
        }
    }
}

/// Where settings live between sessions
pub trait SettingsStore: Send + Sync {
    /// Raw stored data, or `None` when nothing was saved yet
    fn load(&self) -> Result<Option<Value>>;

    /// Persist settings
    fn save(&self, settings: &Settings) -> Result<()>;
}

/// Load, migrate, downgrade and write back if anything changed
pub fn load_settings(store: &dyn SettingsStore) -> Result<Settings> {
    let Some(value) = store.load()? else {
        debug!("No stored settings, using defaults");
        return Ok(Settings::default());
    };

    let loaded = Settings::from_value(value)?;
    if loaded.needs_save() {
        store.save(&loaded.settings)?;
    }

    Ok(loaded.settings)
}

/// Settings kept in a pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<Option<Value>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}

/// In-memory store, handy for embedding and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    value: Mutex<Option<Value>>,
}

impl MemoryStore {
    /// Create a store seeded with raw data
    pub fn with_value(value: Value) -> Self {
        Self {
            value: Mutex::new(Some(value)),
        }
    }

    /// Current raw contents
    pub fn value(&self) -> Option<Value> {
        self.value.lock().clone()
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Option<Value>> {
        Ok(self.value.lock().clone())
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        *self.value.lock() = Some(serde_json::to_value(settings)?);
        Ok(())
    }
}

fn current_version() -> u32 {
    SETTINGS_FORMAT_VERSION
}

fn default_true() -> bool {
    true
}
