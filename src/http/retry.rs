//! Fixed-delay retry combinator
//!
//! Every failure is treated the same: a refused connection, a timeout and
//! a rejected status code all cost one attempt and are followed by the same
//! fixed pause. There is no backoff and no jitter. The target failure mode
//! is a provider that is not reachable yet while its container starts.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default number of attempts before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;

/// Default pause between attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Retry policy: attempt budget, fixed delay, optional overall deadline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Pause between two attempts
    pub delay: Duration,
    /// Upper bound on the whole retry loop (none by default)
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
            deadline: None,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given attempt budget and delay
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            deadline: None,
        }
    }

    /// Set the attempt budget
    #[must_use]
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the delay between attempts
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Bound the whole loop by a deadline
    #[must_use]
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Effective attempt budget (a budget of zero still makes one attempt)
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Run `operation` until it succeeds or the budget is spent.
    ///
    /// The last error is returned unchanged.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &str,
        cancel: Option<&CancellationToken>,
        f: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run_if(operation, cancel, f, |_| true).await
    }

    /// Like [`RetryPolicy::run`], but stops early on errors the predicate rejects
    pub async fn run_if<T, F, Fut, P>(
        &self,
        operation: &str,
        cancel: Option<&CancellationToken>,
        f: F,
        should_retry: P,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&Error) -> bool,
    {
        let attempts = self.attempt_loop(operation, cancel, f, should_retry);

        match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, attempts)
                .await
                .map_err(|_| {
                    warn!("{}: deadline of {:?} exceeded", operation, deadline);
                    Error::Timeout {
                        timeout_ms: deadline.as_millis() as u64,
                    }
                })?,
            None => attempts.await,
        }
    }

    async fn attempt_loop<T, F, Fut, P>(
        &self,
        operation: &str,
        cancel: Option<&CancellationToken>,
        mut f: F,
        should_retry: P,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&Error) -> bool,
    {
        let max_attempts = self.attempts();
        let mut attempt = 1;

        loop {
            match interruptible(cancel, f()).await? {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{}: succeeded on attempt {}", operation, attempt);
                    }
                    return Ok(value);
                }
                Err(e) => {
                    if !should_retry(&e) {
                        debug!("{}: non-retryable error: {}", operation, e);
                        return Err(e);
                    }
                    if attempt >= max_attempts {
                        warn!(
                            "{}: giving up after {} attempts: {}",
                            operation, max_attempts, e
                        );
                        return Err(e);
                    }

                    warn!(
                        "{}: attempt {}/{} failed ({}), retrying in {:?}",
                        operation, attempt, max_attempts, e, self.delay
                    );
                    interruptible(cancel, tokio::time::sleep(self.delay)).await?;
                    attempt += 1;
                }
            }
        }
    }
}

/// Race a future against the cancellation token, if any
async fn interruptible<F: Future>(cancel: Option<&CancellationToken>, fut: F) -> Result<F::Output> {
    match cancel {
        Some(token) => tokio::select! {
            biased;
            () = token.cancelled() => Err(Error::Cancelled),
            out = fut => Ok(out),
        },
        None => Ok(fut.await),
    }
}

#[cfg(test)]
mod retry_tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn failing_until(
        calls: &Arc<AtomicU32>,
        failures: u32,
    ) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = Result<u32>> + Send>> {
        let calls = Arc::clone(calls);
        move || {
            let calls = Arc::clone(&calls);
            Box::pin(async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n <= failures {
                    Err(Error::http_status(503, "not yet"))
                } else {
                    Ok(n)
                }
            })
        }
    }

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 60);
        assert_eq!(policy.delay, Duration::from_millis(1000));
        assert!(policy.deadline.is_none());
    }

    #[test]
    fn test_retry_policy_builder() {
        let policy = RetryPolicy::default()
            .max_attempts(5)
            .delay(Duration::from_millis(10))
            .deadline(Duration::from_secs(2));
        assert_eq!(policy, {
            let mut p = RetryPolicy::new(5, Duration::from_millis(10));
            p.deadline = Some(Duration::from_secs(2));
            p
        });
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_first_try_without_sleeping() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let result = RetryPolicy::default()
            .run("op", None, failing_until(&calls, 0))
            .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_n_times_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(10, Duration::from_millis(1000));
        let start = Instant::now();

        let result = policy.run("op", None, failing_until(&calls, 4)).await;

        assert_eq!(result.unwrap(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert!(start.elapsed() >= Duration::from_millis(4000));
        assert!(start.elapsed() < Duration::from_millis(5000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_stops_at_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::default();
        let start = Instant::now();

        let result = policy.run("op", None, failing_until(&calls, u32::MAX)).await;

        let err = result.unwrap_err();
        assert!(matches!(err, Error::HttpStatus { status: 503, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 60);
        // 59 pauses between 60 attempts, none after the last one
        assert_eq!(start.elapsed(), Duration::from_millis(59_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_predicate_stops_early() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<()> = RetryPolicy::default()
            .run_if(
                "op",
                None,
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Err(Error::config("bad key")) }
                },
                Error::is_transport,
            )
            .await;

        assert!(matches!(result, Err(Error::Configuration { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_sleep() {
        let calls = Arc::new(AtomicU32::new(0));
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            canceller.cancel();
        });

        let result = RetryPolicy::default()
            .run("op", Some(&token), failing_until(&calls, u32::MAX))
            .await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start() {
        let calls = Arc::new(AtomicU32::new(0));
        let token = CancellationToken::new();
        token.cancel();

        let result = RetryPolicy::default()
            .run("op", Some(&token), failing_until(&calls, 0))
            .await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::default().deadline(Duration::from_millis(3500));

        let result = policy
            .run("op", None, failing_until(&calls, u32::MAX))
            .await;

        assert!(matches!(result, Err(Error::Timeout { timeout_ms: 3500 })));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
