//! Rule chain runner
//!
//! Applies every compiled rule, in order, to the evolving text. Each rule
//! sees the previous rule's output. A rule that fails outright is rolled back
//! and the chain moves on; nothing ever reaches the paste handler as an error.

use futures::FutureExt;
use pastecraft_core::notify::{ERROR_NOTICE, SUMMARY_NOTICE};
use pastecraft_core::{Error, NotificationSink, Result, RunResult};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::compiler::{compile_rules, CompiledAction, CompiledRule};
use crate::executor::TransformExecutor;
use crate::script::ScriptEngine;
use crate::settings::Settings;

/// Owns the settings and their compiled rules, and runs pastes through them
pub struct RuleChainRunner {
    settings: Settings,
    rules: Vec<CompiledRule>,
    engine: Arc<dyn ScriptEngine>,
    sink: Arc<dyn NotificationSink>,
    executor: TransformExecutor,
}

impl RuleChainRunner {
    /// Create a runner and compile `settings`
    pub fn new(
        settings: Settings,
        engine: Arc<dyn ScriptEngine>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let mut runner = Self {
            settings: Settings::default(),
            rules: Vec::new(),
            engine,
            executor: TransformExecutor::new(Arc::clone(&sink)),
            sink,
        };
        runner.update_settings(settings);
        runner
    }

    /// Replace the settings and rebuild every compiled rule
    pub fn update_settings(&mut self, settings: Settings) {
        let compiled = compile_rules(&settings, self.engine.as_ref());

        for diagnostic in &compiled.diagnostics {
            warn!(
                rule = diagnostic.ordinal,
                kind = ?diagnostic.kind,
                error = %diagnostic.message,
                "Skipping rule that failed to compile"
            );
            self.sink.notify(&diagnostic.notice(), ERROR_NOTICE);
        }

        info!(
            configured = settings.rules.len(),
            active = compiled.rules.len(),
            engine = self.engine.name(),
            transforms_allowed = settings.transform_execution_allowed,
            "Rules compiled"
        );

        self.settings = settings;
        self.rules = compiled.rules;
    }

    /// Current settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Rules that will run, in order
    pub fn compiled_rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Run a paste that may carry no text at all
    pub async fn run_pasted(&self, pasted: Option<&str>) -> RunResult {
        match pasted {
            Some(text) => self.run(text).await,
            None => RunResult::empty(),
        }
    }

    /// Run `text` through the whole chain
    pub async fn run(&self, text: &str) -> RunResult {
        metrics::counter!("pastecraft_runs_total").increment(1);

        let mut current = text.to_string();
        let mut triggered = Vec::new();

        for rule in &self.rules {
            if !rule.is_match(&current) {
                continue;
            }

            self.trace_rule(rule, "Applying rule", &current);

            let applied = AssertUnwindSafe(self.apply_rule(rule, &current))
                .catch_unwind()
                .await;

            let next = match applied {
                Ok(Ok(next)) => next,
                Ok(Err(e)) => {
                    self.report_rule_failure(rule, &e.to_string());
                    continue;
                }
                Err(panic) => {
                    self.report_rule_failure(rule, &panic_message(panic.as_ref()));
                    continue;
                }
            };

            if next != current {
                triggered.push(rule.ordinal());
                metrics::counter!("pastecraft_rule_triggers_total").increment(1);
                current = next;
                self.trace_rule(rule, "Rule changed text", &current);
            }
        }

        if !triggered.is_empty() && self.settings.show_rule_notifications {
            self.sink.notify(&summary(&triggered), SUMMARY_NOTICE);
        }

        RunResult::new(text, current)
    }

    async fn apply_rule(&self, rule: &CompiledRule, text: &str) -> Result<String> {
        match rule.action() {
            CompiledAction::StaticReplace(template) => Ok(rule.replace_all(template, text)),
            CompiledAction::ExecutableTransform(transform) => {
                let contexts = rule.match_contexts(text);
                let mut output = text.to_string();

                // Back to front, so spans of earlier matches stay valid.
                for ctx in contexts.iter().rev() {
                    let replacement = self
                        .executor
                        .invoke(transform.as_ref(), ctx, rule.ordinal())
                        .await;

                    let span = ctx.span();
                    if output.get(span.clone()).is_none() {
                        return Err(Error::internal(format!(
                            "match span {:?} is outside the text",
                            span
                        )));
                    }
                    output.replace_range(span, &replacement);
                }

                Ok(output)
            }
        }
    }

    fn report_rule_failure(&self, rule: &CompiledRule, message: &str) {
        error!(rule = rule.ordinal(), error = %message, "Rule failed, discarding its changes");
        metrics::counter!("pastecraft_rule_failures_total").increment(1);
        self.sink.notify(
            &format!("Rule {}: failed and was skipped: {}", rule.ordinal(), message),
            ERROR_NOTICE,
        );
    }

    fn trace_rule(&self, rule: &CompiledRule, message: &str, text: &str) {
        if self.settings.debug_mode {
            info!(
                rule = rule.ordinal(),
                pattern = rule.pattern(),
                len = text.len(),
                "{}",
                message
            );
        } else {
            debug!(
                rule = rule.ordinal(),
                pattern = rule.pattern(),
                len = text.len(),
                "{}",
                message
            );
        }
    }
}

fn summary(ordinals: &[usize]) -> String {
    let list = ordinals
        .iter()
        .map(|o| o.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    if ordinals.len() == 1 {
        format!("Applied rule {}", list)
    } else {
        format!("Applied rules {}", list)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "rule panicked".to_string()
    }
}
