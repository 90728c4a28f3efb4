// Retry logic with exponential backoff
//
// Only for idempotent calls (the model check). Message sending is never
// retried: a duplicate request could yield a duplicate model turn.

use anyhow::Result;
use std::time::Duration;
use tokio::time::sleep;

const MAX_RETRIES: u32 = 3;
const BASE_DELAY_MS: u64 = 1000;

/// Attempts and base delay for [`with_retry_policy`]
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRIES,
            base_delay: Duration::from_millis(BASE_DELAY_MS),
        }
    }
}

/// Execute a function with the default backoff policy
pub async fn with_retry<F, Fut, T>(f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    with_retry_policy(RetryPolicy::default(), f).await
}

/// Execute a function, doubling the delay after each failed attempt
pub async fn with_retry_policy<F, Fut, T>(policy: RetryPolicy, f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt + 1 >= attempts => return Err(e),
            Err(e) => {
                let delay = policy.base_delay * 2u32.pow(attempt);
                tracing::warn!(
                    "Request failed (attempt {}/{}): {:#}; retrying in {:?}",
                    attempt + 1,
                    attempts,
                    e,
                    delay
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_retry(|| async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                anyhow::bail!("transient")
            }
            Ok(n)
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("always down")
        })
        .await;

        assert!(result.unwrap_err().to_string().contains("always down"));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_RETRIES);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_doubles() {
        let start = tokio::time::Instant::now();
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        };
        let _ = with_retry_policy(policy, || async { Err::<(), _>(anyhow::anyhow!("nope")) }).await;

        // 100ms + 200ms of virtual sleep
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }
}
