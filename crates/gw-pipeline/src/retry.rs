//! Bounded retry with exponential backoff.

use std::time::Duration;

use backon::{BlockingRetryable, ExponentialBuilder};

use gw_core::Result;

/// Retry policy for per-file reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one (at least 1)
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub base_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self { max_attempts: 1, base_delay: Duration::ZERO, max_delay: Duration::ZERO }
    }

    /// Doubling delays from `base_delay`, capped at `max_delay`, no jitter.
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_factor(2.0)
            .with_max_times(self.max_attempts.max(1) as usize - 1)
    }

    /// Run `op` until it succeeds or the attempts run out; the last error is returned.
    pub fn run<T>(&self, what: &str, op: impl FnMut() -> Result<T>) -> Result<T> {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0u32;
        op.retry(self.backoff())
            .sleep(std::thread::sleep)
            .notify(|e: &gw_core::Error, delay: Duration| {
                attempt += 1;
                tracing::debug!(
                    target = what,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "attempt failed, retrying"
                );
            })
            .call()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backon::BackoffBuilder;
    use gw_core::Error;

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy { max_attempts, base_delay: Duration::ZERO, max_delay: Duration::ZERO }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let p = RetryPolicy {
            max_attempts: 6,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
        };
        let delays: Vec<u128> = p.backoff().build().map(|d| d.as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 400, 500, 500]);
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let mut calls = 0;
        let value = fast(3)
            .run("flaky", || {
                calls += 1;
                if calls < 3 { Err(Error::Validation("transient".into())) } else { Ok(calls) }
            })
            .unwrap();
        assert_eq!(value, 3);
    }

    #[test]
    fn gives_up_with_last_error() {
        let mut calls = 0;
        let err = fast(3)
            .run::<()>("broken", || {
                calls += 1;
                Err(Error::Validation(format!("failure {calls}")))
            })
            .unwrap_err();
        assert_eq!(calls, 3);
        assert!(err.to_string().contains("failure 3"));
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let mut calls = 0;
        let _ = fast(0).run::<()>("once", || {
            calls += 1;
            Err(Error::Validation("no".into()))
        });
        assert_eq!(calls, 1);
        assert_eq!(RetryPolicy::none().max_attempts, 1);
    }
}
