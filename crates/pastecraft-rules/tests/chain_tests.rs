//! End-to-end tests for the rule chain

use async_trait::async_trait;
use pastecraft_core::{Error, RecordingSink, Result};
use pastecraft_rules::{
    FnTransform, MatchContext, RhaiEngine, Rule, RuleChainRunner, ScriptEngine, Settings, Transform,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn rhai_runner(settings: Settings) -> (RuleChainRunner, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let runner = RuleChainRunner::new(settings, Arc::new(RhaiEngine::new()), sink.clone());
    (runner, sink)
}

/// Engine whose "code" is a delay in milliseconds; the transform upper-cases
struct SleepEngine;

struct SleepTransform {
    delay: Duration,
}

#[async_trait]
impl Transform for SleepTransform {
    async fn apply(&self, ctx: &MatchContext) -> Result<String> {
        tokio::time::sleep(self.delay).await;
        Ok(ctx.matched().to_uppercase())
    }
}

impl ScriptEngine for SleepEngine {
    fn name(&self) -> &str {
        "sleep"
    }

    fn compile(&self, code: &str) -> Result<Arc<dyn Transform>> {
        let millis = code
            .trim()
            .parse::<u64>()
            .map_err(|e| Error::script_compile(e.to_string()))?;
        Ok(Arc::new(SleepTransform {
            delay: Duration::from_millis(millis),
        }))
    }
}

/// Engine counting how often its transforms run
struct CountingEngine {
    calls: Arc<AtomicUsize>,
}

impl ScriptEngine for CountingEngine {
    fn name(&self) -> &str {
        "counting"
    }

    fn compile(&self, code: &str) -> Result<Arc<dyn Transform>> {
        let calls = Arc::clone(&self.calls);
        let output = code.to_string();
        Ok(Arc::new(FnTransform::new(move |_: &MatchContext| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(output.clone())
        })))
    }
}

/// Engine whose transforms panic
struct PanicEngine;

impl ScriptEngine for PanicEngine {
    fn name(&self) -> &str {
        "panic"
    }

    fn compile(&self, _code: &str) -> Result<Arc<dyn Transform>> {
        Ok(Arc::new(FnTransform::new(|_: &MatchContext| -> Result<String> {
            panic!("transform exploded")
        })))
    }
}

#[tokio::test]
async fn disabled_rule_never_alters_text() {
    let (runner, sink) = rhai_runner(Settings::with_rules(vec![
        Rule::static_replace("hello", "bye").disabled(),
    ]));

    let result = runner.run("hello world").await;
    assert!(!result.changed);
    assert_eq!(result.result, "hello world");
    assert!(sink.messages().is_empty());
}

#[tokio::test]
async fn non_matching_rule_returns_input() {
    let (runner, sink) = rhai_runner(Settings::with_rules(vec![Rule::static_replace(
        r"\d{4}-\d{2}",
        "DATE",
    )]));

    let input = "some text without matches";
    let result = runner.run(input).await;
    assert!(!result.changed);
    assert_eq!(result.result, input);
    assert!(sink.messages().is_empty());
}

#[tokio::test]
async fn second_pass_is_stable_without_rematches() {
    let (runner, _sink) = rhai_runner(Settings::with_rules(vec![
        Rule::static_replace(r"\bcolour\b", "color"),
        Rule::static_replace(r"\bgrey\b", "gray"),
    ]));

    let first = runner.run("grey colour, grey sky").await;
    assert!(first.changed);
    assert_eq!(first.result, "gray color, gray sky");

    let second = runner.run(&first.result).await;
    assert!(!second.changed);
    assert_eq!(second.result, first.result);
}

#[tokio::test]
async fn static_rule_replaces_every_match() {
    let (runner, _sink) = rhai_runner(Settings::with_rules(vec![Rule::static_replace(
        r"(\w+)@example\.com",
        "<$1>",
    )]));

    let result = runner.run("a@example.com, b@example.com").await;
    assert_eq!(result.result, "<a>, <b>");
}

#[tokio::test]
async fn transform_applies_to_every_match() {
    let settings = Settings::with_rules(vec![Rule::transform(
        r"num:(\d+)",
        r#""NUMBER:" + groups[1]"#,
    )])
    .allow_transforms(true);
    let (runner, sink) = rhai_runner(settings);

    let result = runner.run("num:123 and num:456 and num:789").await;
    assert!(result.changed);
    assert_eq!(result.result, "NUMBER:123 and NUMBER:456 and NUMBER:789");
    assert_eq!(sink.messages(), vec!["Applied rule 1".to_string()]);
}

#[tokio::test]
async fn transform_splices_replacements_of_any_length() {
    let settings = Settings::with_rules(vec![Rule::transform(r"\w+", "matched + matched")])
        .allow_transforms(true);
    let (runner, _sink) = rhai_runner(settings);

    let result = runner.run("a-bb-ccc").await;
    assert_eq!(result.result, "aa-bbbb-cccccc");
}

#[tokio::test]
async fn chain_feeds_each_rule_the_previous_output() {
    let settings = Settings::with_rules(vec![
        Rule::static_replace("test", "STEP1"),
        Rule::static_replace("STEP1", "STEP2"),
        Rule::transform("STEP2", r#""FINAL""#),
    ])
    .allow_transforms(true);
    let (runner, sink) = rhai_runner(settings);

    let result = runner.run("test").await;
    assert!(result.changed);
    assert_eq!(result.result, "FINAL");
    assert_eq!(sink.messages(), vec!["Applied rules 1, 2, 3".to_string()]);
}

#[tokio::test]
async fn failing_transform_does_not_stop_chain() {
    let settings = Settings::with_rules(vec![
        Rule::static_replace("test", "RESULT1"),
        Rule::transform("RESULT1", r#"throw "broken""#),
        Rule::static_replace("RESULT1", "RESULT3"),
    ])
    .allow_transforms(true);
    let (runner, sink) = rhai_runner(settings);

    let result = runner.run("test").await;
    assert!(result.changed);
    assert_eq!(result.result, "RESULT3");
    assert_eq!(
        sink.count_containing("Rule 2: script execution error: broken"),
        1
    );
    assert_eq!(sink.count_containing("Applied rules 1, 3"), 1);
}

#[tokio::test]
async fn failing_match_keeps_only_that_match() {
    let settings = Settings::with_rules(vec![Rule::transform(
        r"(\d)",
        r#"if groups[1] == "2" { throw "bad digit" } "<" + matched + ">""#,
    )])
    .allow_transforms(true);
    let (runner, sink) = rhai_runner(settings);

    let result = runner.run("1 2 3").await;
    assert_eq!(result.result, "<1> 2 <3>");
    assert_eq!(sink.count_containing("script execution error: bad digit"), 1);
}

#[tokio::test]
async fn panicking_rule_is_rolled_back() {
    let sink = Arc::new(RecordingSink::new());
    let settings = Settings::with_rules(vec![
        Rule::static_replace("a", "b"),
        Rule::transform("b", "ignored"),
        Rule::static_replace("b", "c"),
    ])
    .allow_transforms(true);
    let runner = RuleChainRunner::new(settings, Arc::new(PanicEngine), sink.clone());

    let result = runner.run("a").await;
    assert!(result.changed);
    assert_eq!(result.result, "c");
    assert_eq!(sink.count_containing("Rule 2: failed and was skipped"), 1);
}

#[tokio::test]
async fn transform_rules_need_permission() {
    let calls = Arc::new(AtomicUsize::new(0));
    let engine = Arc::new(CountingEngine {
        calls: Arc::clone(&calls),
    });
    let sink = Arc::new(RecordingSink::new());
    let settings = Settings::with_rules(vec![Rule::transform("secret", "REPLACED")]);

    let runner = RuleChainRunner::new(settings.clone(), engine.clone(), sink.clone());
    let result = runner.run("a secret").await;
    assert!(!result.changed);
    assert_eq!(result.result, "a secret");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(sink.messages().is_empty());

    let runner = RuleChainRunner::new(settings.allow_transforms(true), engine, sink);
    assert_eq!(runner.run("a secret").await.result, "a REPLACED");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn transform_runs_once_per_match() {
    let calls = Arc::new(AtomicUsize::new(0));
    let engine = Arc::new(CountingEngine {
        calls: Arc::clone(&calls),
    });
    let settings = Settings::with_rules(vec![Rule::transform("x", "y")]).allow_transforms(true);
    let runner = RuleChainRunner::new(settings, engine, Arc::new(RecordingSink::new()));

    assert_eq!(runner.run("x x x").await.result, "y y y");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn fast_transforms_never_warn() {
    let sink = Arc::new(RecordingSink::new());
    let settings = Settings::with_rules(vec![Rule::transform("ab", "2000")]).allow_transforms(true);
    let runner = RuleChainRunner::new(settings, Arc::new(SleepEngine), sink.clone());

    let result = runner.run("ab ab").await;
    assert_eq!(result.result, "AB AB");
    assert_eq!(sink.count_containing("taking longer"), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_transforms_warn_once_per_match() {
    let sink = Arc::new(RecordingSink::new());
    let settings = Settings::with_rules(vec![Rule::transform("ab", "4000")]).allow_transforms(true);
    let runner = RuleChainRunner::new(settings, Arc::new(SleepEngine), sink.clone());

    let result = runner.run("ab ab ab").await;
    assert_eq!(result.result, "AB AB AB");
    assert_eq!(
        sink.count_containing("Rule 1: script is taking longer than expected"),
        3
    );
    assert_eq!(sink.count_containing("Applied rule 1"), 1);
}

#[tokio::test]
async fn absent_paste_is_a_noop() {
    let (runner, _sink) = rhai_runner(Settings::with_rules(vec![Rule::static_replace(
        "a", "b",
    )]));

    let result = runner.run_pasted(None).await;
    assert!(!result.changed);
    assert_eq!(result.result, "");

    let result = runner.run_pasted(Some("a")).await;
    assert_eq!(result.result, "b");
}
