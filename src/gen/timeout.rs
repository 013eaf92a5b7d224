//! Deadline Handling
//!
//! Wraps the suspension points of a generation call (provider I/O and
//! backoff waits) in a caller-supplied deadline, so an upstream request
//! timeout aborts the in-flight generation instead of leaking it.

use std::future::Future;
use std::time::Duration;

use crate::types::{RecapError, Result};

/// Run `future` under an optional deadline.
///
/// With `None` the future runs to completion; with `Some(d)` it is aborted
/// after `d` with a typed timeout error naming the operation.
pub async fn with_deadline<T, F>(
    deadline: Option<Duration>,
    future: F,
    operation_name: &str,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match deadline {
        None => future.await,
        Some(limit) => match tokio::time::timeout(limit, future).await {
            Ok(result) => result,
            Err(_) => Err(RecapError::timeout(operation_name, limit)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_deadline_completes() {
        let result = with_deadline(None, async { Ok::<_, RecapError>(42) }, "op").await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_deadline_allows_fast_work() {
        let result = with_deadline(
            Some(Duration::from_secs(1)),
            async { Ok::<_, RecapError>("done") },
            "op",
        )
        .await;
        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test]
    async fn test_deadline_aborts_slow_work() {
        let result = with_deadline(
            Some(Duration::from_millis(10)),
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, RecapError>(())
            },
            "slow generation",
        )
        .await;

        match result {
            Err(RecapError::Timeout { operation, .. }) => {
                assert_eq!(operation, "slow generation");
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
