//! Bounded retries for store operations.

use std::future::Future;
use std::time::Duration;

use crate::error::StoreError;

/// How persistently to retry a failing store operation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Per-attempt timeout.
    pub per_attempt: Duration,
    /// Pause between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            per_attempt: Duration::from_secs(2),
            backoff: Duration::from_millis(100),
        }
    }
}

/// Runs `op` under the policy: each attempt gets a short timeout, and
/// after the last failure the error is surfaced as
/// [`StoreError::RetriesExhausted`] so the caller can report a fatal
/// failure while the last persisted state stays authoritative.
pub async fn with_retries<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let attempts = policy.attempts.max(1);
    let mut last = String::new();
    for attempt in 1..=attempts {
        match tokio::time::timeout(policy.per_attempt, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) => {
                tracing::warn!(attempt, error = %err, "store operation failed");
                last = err.to_string();
            }
            Err(_) => {
                tracing::warn!(attempt, "store operation timed out");
                last = "timed out".to_string();
            }
        }
        if attempt < attempts {
            tokio::time::sleep(policy.backoff).await;
        }
    }
    Err(StoreError::RetriesExhausted { attempts, last })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn quick_policy() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            per_attempt: Duration::from_millis(50),
            backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn first_success_returns_immediately() {
        let calls = AtomicU32::new(0);
        let result = with_retries(quick_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, StoreError>(7) }
        })
        .await
        .unwrap();
        assert_eq!(result, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let result = with_retries(quick_policy(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(StoreError::Unavailable("connection reset".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exhausts_after_bounded_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retries(quick_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::Unavailable("down".into())) }
        })
        .await;

        assert!(matches!(
            result,
            Err(StoreError::RetriesExhausted { attempts: 3, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn slow_attempts_count_as_failures() {
        let policy = RetryPolicy {
            attempts: 2,
            per_attempt: Duration::from_millis(10),
            backoff: Duration::from_millis(1),
        };
        let result: Result<(), _> = with_retries(policy, || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(StoreError::RetriesExhausted { .. })));
    }
}
