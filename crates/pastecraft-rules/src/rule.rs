//! Rule definitions

use serde::{Deserialize, Serialize};

/// How a rule turns a match into replacement text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RuleMode {
    /// Expand the rule's `template` with backreferences
    #[default]
    StaticReplace,

    /// Run the rule's `code` once per match
    ExecutableTransform,
}

/// A single user-authored rule
///
/// `template` is only read in [`RuleMode::StaticReplace`] and `code` only in
/// [`RuleMode::ExecutableTransform`]. The inactive field is kept so toggling
/// the mode back does not lose anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Regular expression to search for
    pub pattern: String,

    /// Transform mode
    #[serde(default)]
    pub mode: RuleMode,

    /// Replacement template for static rules
    #[serde(default)]
    pub template: String,

    /// Transform source for executable rules
    #[serde(default)]
    pub code: String,

    /// Whether this rule is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Case-insensitive matching
    #[serde(default)]
    pub case_insensitive: bool,

    /// Free-form note shown in settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Rule {
    /// Create an enabled static-replace rule
    pub fn static_replace(pattern: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            mode: RuleMode::StaticReplace,
            template: template.into(),
            code: String::new(),
            enabled: true,
            case_insensitive: false,
            description: None,
        }
    }

    /// Create an enabled executable-transform rule
    pub fn transform(pattern: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            mode: RuleMode::ExecutableTransform,
            template: String::new(),
            code: code.into(),
            enabled: true,
            case_insensitive: false,
            description: None,
        }
    }

    /// Return this rule with `enabled` set to false
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Return this rule with case-insensitive matching
    pub fn ignore_case(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    /// Whether this rule runs user code
    pub fn is_executable(&self) -> bool {
        self.mode == RuleMode::ExecutableTransform
    }
}

fn default_true() -> bool {
    true
}
