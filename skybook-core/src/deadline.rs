use std::future::Future;
use std::time::Duration;

use crate::{CoreError, CoreResult};

/// Runs one unit of work under `limit`. On expiry the future is dropped,
/// which rolls back any transaction it still holds.
pub async fn bounded<T, F>(limit: Duration, work: F) -> CoreResult<T>
where
    F: Future<Output = CoreResult<T>>,
{
    match tokio::time::timeout(limit, work).await {
        Ok(result) => result,
        Err(_) => Err(CoreError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_slow_work_times_out() {
        let limit = Duration::from_millis(10);
        let result: CoreResult<()> = bounded(limit, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(CoreError::Timeout(d)) if d == limit));
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let result: CoreResult<()> = bounded(Duration::from_secs(1), async {
            Err(CoreError::NotFound("Booking 9".to_string()))
        })
        .await;
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }
}
