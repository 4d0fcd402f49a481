//! Per-command time budgets for CDP calls
//!
//! A stalled renderer never answers, so every browser round trip goes
//! through [`with_page_timeout`].

use std::future::Future;
use std::time::Duration;

use super::errors::SessionError;

/// Run `operation` with a budget of `timeout_secs`.
///
/// Running out of time yields [`SessionError::Timeout`] naming
/// `operation_name`; the operation's own errors pass through unchanged.
pub async fn with_page_timeout<F, T>(
    operation: F,
    timeout_secs: u64,
    operation_name: &str,
) -> Result<T, SessionError>
where
    F: Future<Output = Result<T, SessionError>>,
{
    match tokio::time::timeout(Duration::from_secs(timeout_secs), operation).await {
        Ok(result) => result,
        Err(_) => Err(SessionError::Timeout {
            operation: operation_name.to_string(),
            secs: timeout_secs,
        }),
    }
}

/// Run `primary` under the budget and, if it fails or stalls, `fallback`.
///
/// Returns the fallback's error when both attempts fail.
pub async fn with_fallback<P, F, FF>(
    primary: P,
    fallback: F,
    timeout_secs: u64,
    operation_name: &str,
) -> Result<(), SessionError>
where
    P: Future<Output = Result<(), SessionError>>,
    F: FnOnce() -> FF,
    FF: Future<Output = Result<(), SessionError>>,
{
    match with_page_timeout(primary, timeout_secs, operation_name).await {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::debug!("{operation_name} failed ({e}), retrying through the fallback");
            with_page_timeout(fallback(), timeout_secs, operation_name).await
        }
    }
}
