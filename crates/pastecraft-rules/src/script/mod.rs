//! Executable transforms
//!
//! A rule in [`RuleMode::ExecutableTransform`](crate::RuleMode) carries source
//! code. A [`ScriptEngine`] turns that code into a [`Transform`] once at
//! compile time; the chain then calls [`Transform::apply`] once per match.
//! How the code is loaded and run is entirely up to the engine.

use async_trait::async_trait;
use pastecraft_core::Result;
use std::sync::Arc;

use crate::context::MatchContext;

mod rhai_engine;
mod shell_engine;

pub use rhai_engine::RhaiEngine;
pub use shell_engine::ShellEngine;

/// A compiled transform function
#[async_trait]
pub trait Transform: Send + Sync {
    /// Produce the replacement for one match
    async fn apply(&self, ctx: &MatchContext) -> Result<String>;
}

/// Turns rule source code into callable transforms
pub trait ScriptEngine: Send + Sync {
    /// Engine name for logs
    fn name(&self) -> &str;

    /// Compile `code` into a transform
    fn compile(&self, code: &str) -> Result<Arc<dyn Transform>>;
}

/// Transform backed by a plain closure
pub struct FnTransform<F> {
    func: F,
}

impl<F> FnTransform<F>
where
    F: Fn(&MatchContext) -> Result<String> + Send + Sync,
{
    /// Wrap a closure
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> Transform for FnTransform<F>
where
    F: Fn(&MatchContext) -> Result<String> + Send + Sync,
{
    async fn apply(&self, ctx: &MatchContext) -> Result<String> {
        (self.func)(ctx)
    }
}
