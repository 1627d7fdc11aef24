//! Bounded retry around query executor invocation.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::executor::{QueryContext, QueryExecutor};
use crate::output::{QueryError, QueryOutput};

/// Retry policy: bounded attempts with a fixed inter-attempt delay.
///
/// Defaults match the production pipeline: 3 attempts total, 10 seconds
/// between them. A fully failing run therefore blocks its invocation for
/// about 20 seconds before surfacing the error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of attempts, not retries-after-first.
    pub max_attempts: u32,
    /// Fixed delay between attempts. No delay after the final attempt.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Policy for callers that cannot afford to sleep (tests, dev tooling).
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay: Duration::ZERO,
        }
    }
}

/// Classification seam: decides whether a failed attempt may be retried.
///
/// The shipped default treats every executor error as retryable, which is a
/// known trade-off: a permanent failure (e.g. a malformed query) still
/// consumes the full attempt budget and inter-attempt delay before
/// surfacing. The seam exists so that policy can be tightened without
/// changing the controller contract.
pub trait RetryClassifier: Send + Sync {
    fn is_retryable(&self, error: &QueryError) -> bool;
}

/// Default classifier: everything is retryable.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRetry;

impl RetryClassifier for AlwaysRetry {
    fn is_retryable(&self, _error: &QueryError) -> bool {
        true
    }
}

/// Record of one failed attempt.
///
/// Lives only for the duration of a single retry run; surfaced in the
/// exhaustion report and logs, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// 0-based attempt index.
    pub attempt: u32,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

/// Every attempt failed, or a permanent failure cut the run short.
#[derive(Debug, Clone, Error)]
#[error("query execution failed after {attempts} attempt(s): {last_error}")]
pub struct RetryExhausted {
    /// Attempts actually made.
    pub attempts: u32,
    pub last_error: QueryError,
    pub history: Vec<AttemptRecord>,
}

impl RetryExhausted {
    fn new(last_error: QueryError, history: Vec<AttemptRecord>) -> Self {
        Self {
            attempts: history.len() as u32,
            last_error,
            history,
        }
    }
}

/// Drives a query executor with full-restart retries.
///
/// Each attempt reissues the complete query with the same tracing context;
/// no partial state carries over from a failed attempt.
#[derive(Debug, Clone)]
pub struct RetryController<C = AlwaysRetry> {
    policy: RetryPolicy,
    classifier: C,
}

impl RetryController<AlwaysRetry> {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            classifier: AlwaysRetry,
        }
    }
}

impl Default for RetryController<AlwaysRetry> {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl<C: RetryClassifier> RetryController<C> {
    pub fn with_classifier(policy: RetryPolicy, classifier: C) -> Self {
        Self { policy, classifier }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run the executor until it succeeds or the attempt budget is spent.
    ///
    /// A first-attempt success returns immediately, with no delay incurred.
    pub fn run<E: QueryExecutor>(
        &self,
        executor: &E,
        query: &str,
        ctx: &QueryContext,
    ) -> Result<QueryOutput, RetryExhausted> {
        let max = self.policy.max_attempts.max(1);
        let mut history = Vec::new();

        for attempt in 0..max {
            info!(attempt = attempt + 1, max_attempts = max, "executing query");

            match executor.execute(query, ctx) {
                Ok(output) => {
                    info!(attempt = attempt + 1, "query succeeded");
                    return Ok(output);
                }
                Err(err) => {
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = max,
                        error = %err,
                        "query attempt failed"
                    );
                    history.push(AttemptRecord {
                        attempt,
                        error: err.to_string(),
                        failed_at: Utc::now(),
                    });

                    if !self.classifier.is_retryable(&err) {
                        warn!(attempt = attempt + 1, "error classified permanent, not retrying");
                        return Err(RetryExhausted::new(err, history));
                    }
                    if attempt + 1 == max {
                        error!(max_attempts = max, error = %err, "all attempts failed");
                        return Err(RetryExhausted::new(err, history));
                    }

                    info!(
                        delay_ms = self.policy.delay.as_millis() as u64,
                        next_attempt = attempt + 2,
                        "waiting before retry"
                    );
                    std::thread::sleep(self.policy.delay);
                }
            }
        }

        // max_attempts >= 1 always returns from inside the loop.
        Err(RetryExhausted::new(
            QueryError::Internal("no attempts were made".to_string()),
            history,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Instant;

    /// Executor that fails `failures` times, then succeeds.
    struct FlakyExecutor {
        failures: u32,
        calls: Mutex<u32>,
    }

    impl FlakyExecutor {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    impl QueryExecutor for FlakyExecutor {
        fn execute(&self, _query: &str, _ctx: &QueryContext) -> Result<QueryOutput, QueryError> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls <= self.failures {
                Err(QueryError::Execution(format!("attempt {} boom", *calls)))
            } else {
                Ok(QueryOutput::Text {
                    content: "done".to_string(),
                })
            }
        }
    }

    #[test]
    fn first_attempt_success_incurs_no_delay() {
        let executor = FlakyExecutor::new(0);
        let controller = RetryController::new(RetryPolicy::fixed(3, Duration::from_millis(200)));

        let started = Instant::now();
        let output = controller
            .run(&executor, "q", &QueryContext::default())
            .unwrap();

        assert_eq!(
            output,
            QueryOutput::Text {
                content: "done".to_string()
            }
        );
        assert_eq!(executor.calls(), 1);
        assert!(started.elapsed() < Duration::from_millis(200));
    }

    #[test]
    fn two_failures_then_success_waits_twice() {
        let executor = FlakyExecutor::new(2);
        let delay = Duration::from_millis(20);
        let controller = RetryController::new(RetryPolicy::fixed(3, delay));

        let started = Instant::now();
        let output = controller.run(&executor, "q", &QueryContext::default());

        assert!(output.is_ok());
        assert_eq!(executor.calls(), 3);
        assert!(started.elapsed() >= delay * 2);
    }

    #[test]
    fn exhaustion_reports_last_error_and_full_history() {
        let executor = FlakyExecutor::new(u32::MAX);
        let controller = RetryController::new(RetryPolicy::immediate(3));

        let err = controller
            .run(&executor, "q", &QueryContext::default())
            .unwrap_err();

        assert_eq!(err.attempts, 3);
        assert_eq!(err.history.len(), 3);
        assert_eq!(err.history[0].attempt, 0);
        assert_eq!(err.history[2].attempt, 2);
        assert_eq!(
            err.last_error,
            QueryError::Execution("attempt 3 boom".to_string())
        );
        assert!(err.to_string().contains("attempt 3 boom"));
        assert_eq!(executor.calls(), 3);
    }

    #[test]
    fn no_delay_after_final_attempt() {
        let executor = FlakyExecutor::new(u32::MAX);
        let delay = Duration::from_millis(30);
        let controller = RetryController::new(RetryPolicy::fixed(2, delay));

        let started = Instant::now();
        let _ = controller.run(&executor, "q", &QueryContext::default());
        let elapsed = started.elapsed();

        // One inter-attempt delay, none after the second (final) failure.
        assert!(elapsed >= delay);
        assert!(elapsed < delay * 3);
    }

    #[test]
    fn permanent_classification_cuts_the_run_short() {
        struct TranslationIsPermanent;

        impl RetryClassifier for TranslationIsPermanent {
            fn is_retryable(&self, error: &QueryError) -> bool {
                !matches!(error, QueryError::Translation(_))
            }
        }

        struct PermanentFailure;

        impl QueryExecutor for PermanentFailure {
            fn execute(&self, _q: &str, _ctx: &QueryContext) -> Result<QueryOutput, QueryError> {
                Err(QueryError::Translation("unmappable query".to_string()))
            }
        }

        let controller =
            RetryController::with_classifier(RetryPolicy::immediate(3), TranslationIsPermanent);
        let err = controller
            .run(&PermanentFailure, "q", &QueryContext::default())
            .unwrap_err();

        assert_eq!(err.attempts, 1);
        assert_eq!(err.history.len(), 1);
    }

    #[test]
    fn zero_attempt_policy_still_runs_once() {
        let executor = FlakyExecutor::new(0);
        let controller = RetryController::new(RetryPolicy::immediate(0));

        assert!(controller.run(&executor, "q", &QueryContext::default()).is_ok());
        assert_eq!(executor.calls(), 1);
    }
}
