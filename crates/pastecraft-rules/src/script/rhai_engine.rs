//! Rhai-backed transforms
//!
//! The rule's code is a Rhai script. Each invocation gets a fresh scope with
//! these constants:
//!
//! - `matched`: the whole match
//! - `groups`: array of groups, index 0 is the whole match, `()` for groups
//!   that did not participate
//! - `named`: map of named groups
//! - `offset`: byte offset of the match
//!
//! The value of the last expression is the replacement. `throw` fails the
//! match.

use async_trait::async_trait;
use pastecraft_core::{Error, Result};
use rhai::{Array, Dynamic, Engine, EvalAltResult, Map, Scope, AST};
use std::sync::Arc;

use super::{ScriptEngine, Transform};
use crate::context::MatchContext;

/// Script engine running rule code with Rhai
#[derive(Clone)]
pub struct RhaiEngine {
    engine: Arc<Engine>,
}

impl RhaiEngine {
    /// Create an engine with the standard Rhai packages
    pub fn new() -> Self {
        Self::with_engine(Engine::new())
    }

    /// Use a pre-configured Rhai engine (custom functions, limits)
    pub fn with_engine(engine: Engine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

impl Default for RhaiEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEngine for RhaiEngine {
    fn name(&self) -> &str {
        "rhai"
    }

    fn compile(&self, code: &str) -> Result<Arc<dyn Transform>> {
        let ast = self
            .engine
            .compile(code)
            .map_err(|e| Error::script_compile(e.to_string()))?;

        Ok(Arc::new(RhaiTransform {
            engine: Arc::clone(&self.engine),
            ast: Arc::new(ast),
        }))
    }
}

struct RhaiTransform {
    engine: Arc<Engine>,
    ast: Arc<AST>,
}

#[async_trait]
impl Transform for RhaiTransform {
    async fn apply(&self, ctx: &MatchContext) -> Result<String> {
        let engine = Arc::clone(&self.engine);
        let ast = Arc::clone(&self.ast);
        let ctx = ctx.clone();

        tokio::task::spawn_blocking(move || evaluate(&engine, &ast, &ctx))
            .await
            .map_err(|e| Error::script(format!("transform task failed: {}", e)))?
    }
}

fn evaluate(engine: &Engine, ast: &AST, ctx: &MatchContext) -> Result<String> {
    let groups: Array = ctx
        .groups()
        .iter()
        .map(|g| g.clone().map_or(Dynamic::UNIT, Dynamic::from))
        .collect();

    let named: Map = ctx
        .named_groups()
        .iter()
        .map(|(name, value)| (name.as_str().into(), Dynamic::from(value.clone())))
        .collect();

    let mut scope = Scope::new();
    scope.push_constant("matched", ctx.matched().to_string());
    scope.push_constant("groups", groups);
    scope.push_constant("named", named);
    scope.push_constant("offset", ctx.offset() as i64);

    let value = engine
        .eval_ast_with_scope::<Dynamic>(&mut scope, ast)
        .map_err(|e| Error::script(describe(&e)))?;

    into_replacement(value)
}

/// Thrown values are reported as-is, everything else with Rhai's message
fn describe(err: &EvalAltResult) -> String {
    match err {
        EvalAltResult::ErrorRuntime(value, _) => value.to_string(),
        other => other.to_string(),
    }
}

fn into_replacement(value: Dynamic) -> Result<String> {
    if value.is_unit() {
        return Err(Error::script("transform returned no value"));
    }

    if value.is_string() {
        return value
            .into_string()
            .map_err(|type_name| Error::script(format!("expected a string, got {}", type_name)));
    }

    Ok(value.to_string())
}
