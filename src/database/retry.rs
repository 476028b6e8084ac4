use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::{Error, Result};

pub const MAX_ATTEMPTS: u32 = 5;
const BASE_DELAY_MS: u64 = 1000;
const MAX_JITTER_MS: u64 = 500;

/// Whether the failure means the pool was exhausted rather than the query being wrong.
pub fn is_retryable(err: &Error) -> bool {
    matches!(err, Error::Database(sqlx::Error::PoolTimedOut))
}

pub fn backoff_delay(attempt: u32, jitter_ms: u64) -> Duration {
    Duration::from_millis(BASE_DELAY_MS * 2u64.pow(attempt) + jitter_ms)
}

/// Runs `op` up to [`MAX_ATTEMPTS`] times, sleeping `1s * 2^attempt` plus jitter
/// between attempts that failed on pool exhaustion. Other errors return at once.
pub async fn with_backoff<T, F, Fut>(label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if is_retryable(&err) && attempt + 1 < MAX_ATTEMPTS => {
                let delay = backoff_delay(attempt, rand::thread_rng().gen_range(0..MAX_JITTER_MS));
                tracing::warn!(
                    operation = label,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "database pool exhausted; retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn delay_doubles_per_attempt() {
        assert_eq!(backoff_delay(0, 0), Duration::from_millis(1000));
        assert_eq!(backoff_delay(3, 250), Duration::from_millis(8250));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_pool_timeouts_then_succeeds() {
        let calls = AtomicU32::new(0);
        let value = with_backoff("test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(Error::Database(sqlx::Error::PoolTimedOut))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_backoff("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::Database(sqlx::Error::PoolTimedOut)) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_backoff("test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::BadRequest("nope".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
