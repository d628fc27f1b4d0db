//! Retry and dead-letter pipeline.
//!
//! Wraps any fallible async operation with automatic retry for transient
//! failures and dead-letter routing for everything else. The wrapper is
//! generic over the operation's error type; a classifier function decides
//! whether a given failure is worth retrying.
//!
//! Disposition of a request:
//!
//! ```text
//! Pending -> (Success | Retrying -> Pending)* -> (Success | DeadLettered)
//! ```
//!
//! Every attempt is logged for audit, but the caller only sees the final
//! disposition: the value on success, or a generic failure once the request
//! has been dead-lettered. The detailed payload lives in the sink.

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::dlq::{DeadLetterEntry, DeadLetterKind, DeadLetterQueue};

/// Whether a failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Expected to succeed if retried (temporary unavailability).
    Transient,
    /// Will not succeed no matter how many retries.
    Terminal,
}

/// Backoff policy for transient failures.
///
/// The delay before retry `n` (zero-based) is `base_delay * 2^n`, capped at
/// `max_delay`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry following failed attempt `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.min(31);
        let delay = self.base_delay.saturating_mul(1u32 << exp);
        delay.min(self.max_delay)
    }
}

/// Failure reported to the caller after the pipeline gives up.
///
/// Deliberately generic: the original payload and failure detail are in the
/// dead-letter sink, not in this error.
#[derive(Debug, Error)]
#[error("Request failed after {attempts} attempt(s) and was dead-lettered")]
pub struct DeadLettered {
    pub attempts: u32,
    pub kind: DeadLetterKind,
}

/// Retry wrapper bound to a dead-letter sink.
#[derive(Clone)]
pub struct RetryPipeline {
    policy: RetryPolicy,
    dlq: Option<Arc<DeadLetterQueue>>,
}

impl RetryPipeline {
    pub fn new(policy: RetryPolicy, dlq: Option<Arc<DeadLetterQueue>>) -> Self {
        Self { policy, dlq }
    }

    /// Run `op` to completion under the retry policy.
    ///
    /// `payload` is the original request, preserved verbatim in the
    /// dead-letter entry if the operation is given up on. `classify` maps an
    /// operation error to its [`FailureKind`]; terminal failures skip the
    /// retry loop entirely. Exactly one dead-letter entry is recorded per
    /// failed call, regardless of how many attempts were made.
    pub async fn execute<T, E, F, Fut>(
        &self,
        payload: serde_json::Value,
        classify: impl Fn(&E) -> FailureKind,
        mut op: F,
    ) -> Result<T, DeadLettered>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt: u32 = 0;
        let mut first_failure_at = None;

        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!("Operation succeeded after {} retries", attempt);
                    }
                    return Ok(value);
                }
                Err(error) => {
                    let attempts = attempt + 1;
                    first_failure_at.get_or_insert_with(Utc::now);

                    match classify(&error) {
                        FailureKind::Transient if attempt < self.policy.max_retries => {
                            let delay = self.policy.delay_for(attempt);
                            tracing::warn!(
                                "Attempt {} failed (transient), retrying in {:?}: {}",
                                attempts,
                                delay,
                                error
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                        }
                        kind => {
                            let dl_kind = match kind {
                                FailureKind::Terminal => DeadLetterKind::Terminal,
                                FailureKind::Transient => DeadLetterKind::RetriesExhausted,
                            };
                            tracing::warn!(
                                "Giving up after {} attempt(s) ({}): {}",
                                attempts,
                                dl_kind.as_str(),
                                error
                            );
                            self.dead_letter(
                                payload,
                                error.to_string(),
                                dl_kind,
                                attempts,
                                first_failure_at.unwrap_or_else(Utc::now),
                            )
                            .await;
                            return Err(DeadLettered {
                                attempts,
                                kind: dl_kind,
                            });
                        }
                    }
                }
            }
        }
    }

    async fn dead_letter(
        &self,
        payload: serde_json::Value,
        reason: String,
        kind: DeadLetterKind,
        attempts: u32,
        first_failure_at: chrono::DateTime<Utc>,
    ) {
        let Some(dlq) = &self.dlq else {
            tracing::warn!("DLQ not configured, dropping failure detail: {}", reason);
            return;
        };

        dlq.record(DeadLetterEntry {
            payload,
            reason,
            kind,
            attempts,
            first_failure_at,
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
        }
    }

    fn dlq_in(dir: &TempDir) -> Arc<DeadLetterQueue> {
        Arc::new(
            DeadLetterQueue::from_config(Some(&dir.path().to_path_buf()))
                .unwrap()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn success_on_first_attempt_skips_retry() {
        let temp = TempDir::new().unwrap();
        let dlq = dlq_in(&temp);
        let pipeline = RetryPipeline::new(fast_policy(3), Some(Arc::clone(&dlq)));

        let calls = AtomicU32::new(0);
        let result = pipeline
            .execute(json!({}), |_: &&str| FailureKind::Transient, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, &str>(42) }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(dlq.stats().await.total(), 0);
    }

    #[tokio::test]
    async fn transient_under_bound_recovers_without_dead_letter() {
        let temp = TempDir::new().unwrap();
        let dlq = dlq_in(&temp);
        let pipeline = RetryPipeline::new(fast_policy(3), Some(Arc::clone(&dlq)));

        let calls = AtomicU32::new(0);
        let result = pipeline
            .execute(json!({}), |_: &&str| FailureKind::Transient, || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("temporarily unavailable")
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(dlq.stats().await.total(), 0);
    }

    #[tokio::test]
    async fn transient_over_bound_dead_letters_exactly_once() {
        let temp = TempDir::new().unwrap();
        let dlq = dlq_in(&temp);
        let pipeline = RetryPipeline::new(fast_policy(2), Some(Arc::clone(&dlq)));

        let calls = AtomicU32::new(0);
        let result: Result<(), _> = pipeline
            .execute(
                json!({"title": "doomed"}),
                |_: &&str| FailureKind::Transient,
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("still down") }
                },
            )
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts, 3); // initial + 2 retries
        assert_eq!(err.kind, DeadLetterKind::RetriesExhausted);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let stats = dlq.stats().await;
        assert_eq!(stats.retries_exhausted, 1);
        assert_eq!(stats.total(), 1);
    }

    #[tokio::test]
    async fn terminal_failure_dead_letters_with_zero_retries() {
        let temp = TempDir::new().unwrap();
        let dlq = dlq_in(&temp);
        let pipeline = RetryPipeline::new(fast_policy(5), Some(Arc::clone(&dlq)));

        let calls = AtomicU32::new(0);
        let result: Result<(), _> = pipeline
            .execute(json!({}), |_: &&str| FailureKind::Terminal, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("schema mismatch") }
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts, 1);
        assert_eq!(err.kind, DeadLetterKind::Terminal);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(dlq.stats().await.terminal, 1);
    }

    #[tokio::test]
    async fn missing_dlq_still_reports_failure() {
        let pipeline = RetryPipeline::new(fast_policy(0), None);

        let result: Result<(), _> = pipeline
            .execute(json!({}), |_: &&str| FailureKind::Terminal, || async {
                Err("no sink")
            })
            .await;

        assert!(result.is_err());
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };

        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(350));
        assert_eq!(policy.delay_for(10), Duration::from_millis(350));
    }
}
