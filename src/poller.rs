//! Deadline-bounded convergence polling
//!
//! Replaces ad-hoc "sleep and check again" loops: a probe is evaluated right
//! away and then once per interval until it reports success or the deadline
//! passes. Waiting always happens on the tokio timer.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Result of a single probe evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    /// Condition satisfied
    Done(T),
    /// Not yet; carries the best partial value seen so far, if any
    Pending(Option<T>),
}

/// Outcome of [`retry_until`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome<T> {
    pub converged: bool,
    /// Time from the first probe to the last one
    pub elapsed: Duration,
    pub attempts: u32,
    /// The successful value, or the last partial one on timeout
    pub value: Option<T>,
}

/// Evaluate `probe` now and then every `interval` until it returns
/// [`Probe::Done`] or `deadline` has elapsed.
///
/// Sleeps are clipped to the remaining budget, and one final probe runs at
/// the deadline itself.
pub async fn retry_until<T, F, Fut>(interval: Duration, deadline: Duration, mut probe: F) -> PollOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Probe<T>>,
{
    let started = Instant::now();
    let mut attempts = 0u32;
    let mut best = None;

    loop {
        attempts += 1;
        match probe().await {
            Probe::Done(value) => {
                return PollOutcome {
                    converged: true,
                    elapsed: started.elapsed(),
                    attempts,
                    value: Some(value),
                };
            }
            Probe::Pending(partial) => {
                if partial.is_some() {
                    best = partial;
                }
            }
        }

        let elapsed = started.elapsed();
        if elapsed >= deadline {
            return PollOutcome {
                converged: false,
                elapsed,
                attempts,
                value: best,
            };
        }

        tokio::time::sleep(interval.min(deadline - elapsed)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_converges_at_third_tick() {
        let started = Instant::now();
        let outcome = retry_until(Duration::from_secs(1), Duration::from_secs(5), || async {
            if started.elapsed() >= Duration::from_secs(3) {
                Probe::Done("ready")
            } else {
                Probe::Pending(None)
            }
        })
        .await;

        assert!(outcome.converged);
        assert_eq!(outcome.elapsed, Duration::from_secs(3));
        assert_eq!(outcome.attempts, 4);
        assert_eq!(outcome.value, Some("ready"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_returns_best_partial() {
        let mut calls = 0usize;
        let outcome = retry_until(Duration::from_secs(3), Duration::from_secs(10), || {
            calls += 1;
            let seen = calls;
            async move { Probe::Pending(Some(seen)) }
        })
        .await;

        assert!(!outcome.converged);
        assert_eq!(outcome.elapsed, Duration::from_secs(10));
        // t = 0, 3, 6, 9, 10
        assert_eq!(outcome.attempts, 5);
        assert_eq!(outcome.value, Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_does_not_sleep() {
        let outcome = retry_until(Duration::from_secs(1), Duration::from_secs(20), || async {
            Probe::Done(42)
        })
        .await;

        assert!(outcome.converged);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.elapsed, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_value_is_kept_across_empty_probes() {
        let mut calls = 0usize;
        let outcome: PollOutcome<&str> =
            retry_until(Duration::from_secs(1), Duration::from_secs(2), || {
                calls += 1;
                let first = calls == 1;
                async move { Probe::Pending(first.then_some("partial")) }
            })
            .await;

        assert!(!outcome.converged);
        assert_eq!(outcome.value, Some("partial"));
    }
}
