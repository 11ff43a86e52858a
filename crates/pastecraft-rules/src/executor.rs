//! Transform executor
//!
//! Runs one compiled transform against one match and always comes back with
//! a replacement string:
//! - a transform still running after [`SLOW_TRANSFORM_DELAY`] triggers one
//!   advisory notice, and the executor keeps waiting for the real result
//! - a transform that fails is logged and notified, and the match keeps its
//!   original text

use pastecraft_core::notify::{ERROR_NOTICE, SLOW_NOTICE};
use pastecraft_core::{Error, NotificationSink};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use crate::context::MatchContext;
use crate::script::Transform;

/// How long a transform may run before the slow notice is shown
pub const SLOW_TRANSFORM_DELAY: Duration = Duration::from_millis(3000);

/// Executes transforms with a slow-notice watchdog and error containment
#[derive(Clone)]
pub struct TransformExecutor {
    sink: Arc<dyn NotificationSink>,
}

impl TransformExecutor {
    /// Create an executor reporting to `sink`
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    /// Produce the replacement for one match. Never fails.
    pub async fn invoke(
        &self,
        transform: &dyn Transform,
        ctx: &MatchContext,
        ordinal: usize,
    ) -> String {
        let started = Instant::now();

        let work = transform.apply(ctx);
        tokio::pin!(work);

        let watchdog = tokio::time::sleep(SLOW_TRANSFORM_DELAY);
        tokio::pin!(watchdog);

        // The watchdog only gets to fire while the work is still pending.
        let outcome = tokio::select! {
            biased;
            result = &mut work => result,
            _ = &mut watchdog => {
                warn!(rule = ordinal, "Transform is taking longer than expected");
                metrics::counter!("pastecraft_slow_transforms_total").increment(1);
                self.sink.notify(
                    &format!("Rule {}: script is taking longer than expected", ordinal),
                    SLOW_NOTICE,
                );
                work.await
            }
        };

        match outcome {
            Ok(replacement) => {
                debug!(
                    rule = ordinal,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Transform completed"
                );
                replacement
            }
            Err(e) => {
                error!(rule = ordinal, error = %e, "Transform failed, keeping original text");
                metrics::counter!("pastecraft_transform_errors_total").increment(1);
                let reason = match &e {
                    Error::Script(message) => message.clone(),
                    other => other.to_string(),
                };
                self.sink.notify(
                    &format!("Rule {}: script execution error: {}", ordinal, reason),
                    ERROR_NOTICE,
                );
                ctx.matched().to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::FnTransform;
    use async_trait::async_trait;
    use pastecraft_core::{RecordingSink, Result};

    struct SleepyTransform {
        delay: Duration,
    }

    #[async_trait]
    impl Transform for SleepyTransform {
        async fn apply(&self, ctx: &MatchContext) -> Result<String> {
            tokio::time::sleep(self.delay).await;
            Ok(ctx.matched().to_uppercase())
        }
    }

    fn executor() -> (TransformExecutor, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        (TransformExecutor::new(sink.clone()), sink)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_transform_no_notice() {
        let (executor, sink) = executor();
        let transform = SleepyTransform {
            delay: Duration::from_millis(2999),
        };

        let out = executor
            .invoke(&transform, &MatchContext::new("abc", 0), 1)
            .await;

        assert_eq!(out, "ABC");
        assert!(sink.messages().is_empty());

        // Nothing fires after completion either.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(sink.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_transform_notifies_once_and_finishes() {
        let (executor, sink) = executor();
        let transform = SleepyTransform {
            delay: Duration::from_secs(10),
        };

        let out = executor
            .invoke(&transform, &MatchContext::new("abc", 0), 4)
            .await;

        assert_eq!(out, "ABC");
        assert_eq!(
            sink.messages(),
            vec!["Rule 4: script is taking longer than expected".to_string()]
        );
        assert_eq!(sink.notifications()[0].duration, SLOW_NOTICE);
    }

    #[tokio::test]
    async fn test_failure_keeps_original_text() {
        let (executor, sink) = executor();
        let transform = FnTransform::new(|_: &MatchContext| Err(Error::script("boom")));

        let out = executor
            .invoke(&transform, &MatchContext::new("keep me", 3), 2)
            .await;

        assert_eq!(out, "keep me");
        assert_eq!(
            sink.messages(),
            vec!["Rule 2: script execution error: boom".to_string()]
        );
    }

    #[tokio::test]
    async fn test_non_script_errors_use_same_notice() {
        let (executor, sink) = executor();
        let transform = FnTransform::new(|_: &MatchContext| Err(Error::internal("lost")));

        let out = executor
            .invoke(&transform, &MatchContext::new("abc", 0), 1)
            .await;

        assert_eq!(out, "abc");
        assert_eq!(
            sink.messages(),
            vec!["Rule 1: script execution error: internal error: lost".to_string()]
        );
    }
}
