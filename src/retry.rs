// src/retry.rs
//! Retry with exponential backoff for remote calls.
//!
//! A call is retried only when its error says it is transient. The last
//! error is returned exactly as the operation produced it, so callers can
//! still match on its kind after the retries are spent.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::constants::{DEFAULT_INITIAL_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY};

/// Errors that know whether retrying could help.
pub trait Retryable: Sized {
    /// Timeouts, throttling and 5xx-style failures.
    fn is_transient(&self) -> bool;

    /// A server-provided wait before the next attempt.
    fn retry_after(&self) -> Option<Duration> {
        None
    }

    /// The value returned when the caller cancels mid-call.
    fn cancelled(operation: &str) -> Self;
}

/// How often and how patiently a single remote call is retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included. Zero is treated as one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Adds up to 25% random slack to computed delays.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: false,
        }
    }

    /// Delay before retry number `retry` (1-based), honoring a server hint.
    pub fn delay_for(&self, retry: u32, hint: Option<Duration>) -> Duration {
        if let Some(hint) = hint {
            return hint.min(self.max_delay);
        }

        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        let base = self.initial_delay.saturating_mul(factor).min(self.max_delay);

        if self.jitter && !base.is_zero() {
            let slack = rand::rng().random_range(0.0..0.25);
            Duration::try_from_secs_f64(base.as_secs_f64() * (1.0 + slack))
                .map_or(self.max_delay, |delay| delay.min(self.max_delay))
        } else {
            base
        }
    }
}

/// Runs `operation` until it succeeds, fails permanently, runs out of
/// attempts, or `cancel` fires.
///
/// `operation` must be safe to repeat.
pub async fn retry_with_backoff<F, T, E, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    label: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        if cancel.is_cancelled() {
            return Err(E::cancelled(label));
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(E::cancelled(label)),
            result = operation() => result,
        };

        let error = match result {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !error.is_transient() {
            log::debug!("{}: permanent failure on attempt {}: {}", label, attempt, error);
            return Err(error);
        }

        if attempt >= max_attempts {
            log::warn!("{}: giving up after {} attempts: {}", label, attempt, error);
            return Err(error);
        }

        let delay = policy.delay_for(attempt, error.retry_after());
        log::warn!(
            "{}: attempt {} failed ({}), retrying after {:?}",
            label,
            attempt,
            error,
            delay
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(E::cancelled(label)),
            _ = tokio::time::sleep(delay) => {}
        }

        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient(u32),
        Permanent,
        Cancelled,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl Retryable for TestError {
        fn is_transient(&self) -> bool {
            matches!(self, Self::Transient(_))
        }

        fn cancelled(_operation: &str) -> Self {
            Self::Cancelled
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_two_transient_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<&str, TestError> = retry_with_backoff(
            &RetryPolicy::immediate(3),
            &CancellationToken::new(),
            "flaky",
            move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(TestError::Transient(n))
                } else {
                    Ok("done")
                }
            },
        )
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stops_at_max_attempts_and_returns_last_error() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), TestError> = retry_with_backoff(
            &RetryPolicy::immediate(4),
            &CancellationToken::new(),
            "always-down",
            move || async move { Err(TestError::Transient(calls.fetch_add(1, Ordering::SeqCst) + 1)) },
        )
        .await;

        assert_eq!(result, Err(TestError::Transient(4)));
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), TestError> = retry_with_backoff(
            &RetryPolicy::immediate(5),
            &CancellationToken::new(),
            "not-found",
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Permanent)
            },
        )
        .await;

        assert_eq!(result, Err(TestError::Permanent));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_token_prevents_any_attempt() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: Result<(), TestError> =
            retry_with_backoff(&RetryPolicy::immediate(3), &cancel, "cancelled", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert_eq!(result, Err(TestError::Cancelled));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_backoff_sleep() {
        let cancel = CancellationToken::new();
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_secs(3600),
            max_delay: Duration::from_secs(3600),
            jitter: false,
        };

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), TestError> = retry_with_backoff(&policy, &cancel, "slow", move || async move {
            Err(TestError::Transient(calls.fetch_add(1, Ordering::SeqCst) + 1))
        })
        .await;

        assert_eq!(result, Err(TestError::Cancelled));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(20),
            jitter: false,
        };

        assert_eq!(policy.delay_for(1, None), Duration::from_secs(3));
        assert_eq!(policy.delay_for(2, None), Duration::from_secs(6));
        assert_eq!(policy.delay_for(3, None), Duration::from_secs(12));
        assert_eq!(policy.delay_for(4, None), Duration::from_secs(20));
    }

    #[test]
    fn test_server_hint_overrides_and_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: true,
        };

        assert_eq!(
            policy.delay_for(1, Some(Duration::from_secs(10))),
            Duration::from_secs(10)
        );
        assert_eq!(
            policy.delay_for(1, Some(Duration::from_secs(600))),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_huge_delays_saturate_at_the_cap() {
        let policy = RetryPolicy {
            max_attempts: 100,
            initial_delay: Duration::from_millis(u64::MAX),
            max_delay: Duration::from_secs(u64::MAX),
            jitter: true,
        };

        for retry in [1, 2, 40, 99] {
            assert!(policy.delay_for(retry, None) <= policy.max_delay);
        }
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(60),
            jitter: true,
        };

        for _ in 0..50 {
            let delay = policy.delay_for(1, None);
            assert!(delay >= Duration::from_secs(4));
            assert!(delay <= Duration::from_secs(5));
        }
    }
}
