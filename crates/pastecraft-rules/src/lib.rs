//! Pastecraft Rules
//!
//! Rule chain engine applied to pasted text.
//!
//! Rules pair a regular expression with either:
//! - a replacement template with backreferences, or
//! - an executable transform called once per match
//!
//! Rules run in configured order, each on the previous rule's output. Failures
//! are contained per match and per rule and surfaced through a
//! [`NotificationSink`](pastecraft_core::NotificationSink).

pub mod compiler;
pub mod context;
pub mod executor;
pub mod rule;
pub mod runner;
pub mod script;
pub mod settings;
pub mod template;

pub use compiler::{
    compile_rules, CompileDiagnostic, CompiledAction, CompiledRule, CompiledRuleSet, DiagnosticKind,
};
pub use context::MatchContext;
pub use executor::{TransformExecutor, SLOW_TRANSFORM_DELAY};
pub use rule::{Rule, RuleMode};
pub use runner::RuleChainRunner;
pub use script::{FnTransform, RhaiEngine, ScriptEngine, ShellEngine, Transform};
pub use settings::{
    load_settings, JsonFileStore, LegacySettings, LoadedSettings, MemoryStore, Settings,
    SettingsStore,
};
pub use template::ReplacementTemplate;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::rule::{Rule, RuleMode};
    pub use crate::runner::RuleChainRunner;
    pub use crate::script::{RhaiEngine, ScriptEngine, Transform};
    pub use crate::settings::{load_settings, Settings, SettingsStore};
}
