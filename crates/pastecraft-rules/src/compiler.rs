//! Rule compilation
//!
//! Turns the configured rule list into the runtime form. Compilation is a
//! pure function of the settings: disabled rules are left out, executable
//! rules are left out while transform execution is not allowed, and a rule
//! whose pattern or code fails to compile is left out with a diagnostic.

use pastecraft_core::{Error, Result};
use regex::{Regex, RegexBuilder};
use std::fmt;
use std::sync::Arc;

use crate::context::MatchContext;
use crate::rule::{Rule, RuleMode};
use crate::script::{ScriptEngine, Transform};
use crate::settings::Settings;
use crate::template::ReplacementTemplate;

/// What a compiled rule does with its matches
#[derive(Clone)]
pub enum CompiledAction {
    /// Expand a template for every match in one pass
    StaticReplace(ReplacementTemplate),

    /// Call a transform once per match
    ExecutableTransform(Arc<dyn Transform>),
}

impl fmt::Debug for CompiledAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaticReplace(template) => f
                .debug_tuple("StaticReplace")
                .field(&template.source())
                .finish(),
            Self::ExecutableTransform(_) => f.write_str("ExecutableTransform(..)"),
        }
    }
}

/// A rule ready to run
#[derive(Debug, Clone)]
pub struct CompiledRule {
    ordinal: usize,
    regex: Regex,
    action: CompiledAction,
}

impl CompiledRule {
    /// 1-based position of the source rule in the configured list
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Pattern source
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    /// The compiled action
    pub fn action(&self) -> &CompiledAction {
        &self.action
    }

    /// Whether this rule runs a transform
    pub fn is_executable(&self) -> bool {
        matches!(self.action, CompiledAction::ExecutableTransform(_))
    }

    /// Whether the pattern occurs in `text` at all
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Contexts for every non-overlapping match, in document order
    pub fn match_contexts(&self, text: &str) -> Vec<MatchContext> {
        self.regex
            .captures_iter(text)
            .map(|caps| MatchContext::from_captures(&self.regex, &caps))
            .collect()
    }

    /// Replace every match using `template`
    pub fn replace_all(&self, template: &ReplacementTemplate, text: &str) -> String {
        self.regex
            .replace_all(text, |caps: &regex::Captures<'_>| template.expand(caps, text))
            .into_owned()
    }
}

/// Why a rule was left out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The pattern is empty and would match between every character
    EmptyPattern,
    /// The pattern is not a valid regular expression
    InvalidPattern,
    /// The transform code did not compile
    InvalidScript,
}

/// A rule that could not be compiled
#[derive(Debug, Clone)]
pub struct CompileDiagnostic {
    /// Ordinal of the offending rule
    pub ordinal: usize,

    /// Category
    pub kind: DiagnosticKind,

    /// Compiler message
    pub message: String,
}

impl CompileDiagnostic {
    /// User-facing notice text
    pub fn notice(&self) -> String {
        format!("Rule {}: {}", self.ordinal, self.message)
    }
}

/// Output of one compilation pass
#[derive(Debug, Clone, Default)]
pub struct CompiledRuleSet {
    /// Rules to run, in configured order
    pub rules: Vec<CompiledRule>,

    /// Rules that were dropped because they failed to compile
    pub diagnostics: Vec<CompileDiagnostic>,
}

/// Compile every eligible rule in `settings`
pub fn compile_rules(settings: &Settings, engine: &dyn ScriptEngine) -> CompiledRuleSet {
    let mut set = CompiledRuleSet::default();

    for (index, rule) in settings.rules.iter().enumerate() {
        let ordinal = index + 1;

        if !rule.enabled {
            continue;
        }

        if rule.is_executable() && !settings.transform_execution_allowed {
            continue;
        }

        if rule.pattern.is_empty() {
            set.diagnostics.push(CompileDiagnostic {
                ordinal,
                kind: DiagnosticKind::EmptyPattern,
                message: "pattern is empty".to_string(),
            });
            continue;
        }

        match compile_rule(rule, ordinal, engine) {
            Ok(compiled) => set.rules.push(compiled),
            Err(e) => {
                let kind = match e {
                    Error::ScriptCompile(_) => DiagnosticKind::InvalidScript,
                    _ => DiagnosticKind::InvalidPattern,
                };
                set.diagnostics.push(CompileDiagnostic {
                    ordinal,
                    kind,
                    message: e.to_string(),
                });
            }
        }
    }

    set
}

/// Compile a single rule
pub fn compile_rule(
    rule: &Rule,
    ordinal: usize,
    engine: &dyn ScriptEngine,
) -> Result<CompiledRule> {
    if rule.pattern.is_empty() {
        return Err(Error::pattern("pattern is empty"));
    }

    let regex = RegexBuilder::new(&rule.pattern)
        .case_insensitive(rule.case_insensitive)
        .build()
        .map_err(|e| Error::pattern(e.to_string()))?;

    let action = match rule.mode {
        RuleMode::StaticReplace => {
            CompiledAction::StaticReplace(ReplacementTemplate::parse(&rule.template, &regex))
        }
        RuleMode::ExecutableTransform => {
            CompiledAction::ExecutableTransform(engine.compile(&rule.code)?)
        }
    };

    Ok(CompiledRule {
        ordinal,
        regex,
        action,
    })
}
