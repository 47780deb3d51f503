//! Bounded exponential-backoff retry, shared by the finding and topology
//! sinks (spec.md §7: "bounded retry with exponential backoff (e.g., 1 s,
//! 2 s, 4 s, capped at 3 tries)").

use std::future::Future;
use std::time::Duration;

/// Backoff delays applied between retries, in order.
pub const BACKOFF_SCHEDULE_MS: [u64; 3] = [1000, 2000, 4000];

/// Retry `attempt` up to `BACKOFF_SCHEDULE_MS.len() + 1` total tries,
/// sleeping the schedule's delay between each. Returns the last error if
/// every attempt fails.
pub async fn retry_with_backoff<F, Fut, T, E>(mut attempt: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut last_err = None;
    for (try_index, delay_ms) in std::iter::once(0).chain(BACKOFF_SCHEDULE_MS).enumerate() {
        if try_index > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        match attempt().await {
            Ok(v) => return Ok(v),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.expect("at least one attempt was made"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_with_backoff(|| async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err("not yet")
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result, Ok(2));
    }

    #[tokio::test]
    async fn gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = retry_with_backoff(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("always fails")
        })
        .await;
        assert_eq!(result, Err("always fails"));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
