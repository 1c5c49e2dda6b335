use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const MAX_ATTEMPTS: usize = 5;
const BASE: Duration = Duration::from_secs(4);
const CAP: Duration = Duration::from_secs(60);

/// Full-jitter exponential backoff: a random duration in
/// `[0, min(cap, base * 2^attempt)]`.
pub fn backoff_full_jitter(base: Duration, cap: Duration, attempt: usize) -> Duration {
    let base_ms = base.as_millis() as u64;
    let cap_ms = cap.as_millis() as u64;
    let pow = if attempt >= 63 { u64::MAX } else { 1u64 << attempt };
    let exp_ms = base_ms.saturating_mul(pow);
    let upper = exp_ms.min(cap_ms).max(1);
    let jitter_ms = rand::random_range(0..=upper);
    Duration::from_millis(jitter_ms)
}

/// Retries `op` up to 5 times with full-jitter exponential backoff
/// (base 4s, cap 60s), but only when `is_retryable` reports the error as
/// a throttle/transient condition. Any other error, or the final
/// attempt's error, is returned immediately.
pub async fn retry_with_backoff<T, E, F, Fut>(
    cancel: &CancellationToken,
    is_retryable: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt + 1 >= MAX_ATTEMPTS || !is_retryable(&e) => return Err(e),
            Err(e) => {
                let delay = backoff_full_jitter(BASE, CAP, attempt);
                tracing::warn!(attempt, delay_ms = delay.as_millis() as u64, error = %e_display(&e), "retrying after backoff");
                tokio::select! {
                    () = cancel.cancelled() => return Err(e),
                    () = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
        }
    }
}

fn e_display<E>(e: &E) -> String
where
    E: std::fmt::Debug,
{
    format!("{e:?}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn backoff_caps_and_stays_in_bounds() {
        for attempt in 0..10 {
            let d = backoff_full_jitter(Duration::from_millis(250), Duration::from_secs(10), attempt);
            assert!(d <= Duration::from_secs(10));
        }
    }

    #[tokio::test]
    async fn retries_until_success_within_max_attempts() {
        let cancel = CancellationToken::new();
        let calls = AtomicUsize::new(0);
        let result: Result<i32, &str> = retry_with_backoff(&cancel, |_: &&str| true, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 { Err("throttled") } else { Ok(42) }
            }
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_errors_return_immediately() {
        let cancel = CancellationToken::new();
        let calls = AtomicUsize::new(0);
        let result: Result<i32, &str> = retry_with_backoff(&cancel, |_: &&str| false, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err("fatal") }
        })
        .await;
        assert_eq!(result, Err("fatal"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let cancel = CancellationToken::new();
        let calls = AtomicUsize::new(0);
        let result: Result<i32, &str> = retry_with_backoff(&cancel, |_: &&str| true, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err("throttled") }
        })
        .await;
        assert_eq!(result, Err("throttled"));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }
}
