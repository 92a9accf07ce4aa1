//! 模型调用重试

use std::future::Future;
use std::time::Duration;

use crate::application::ports::ProviderError;
use crate::domain::agent::RetryPolicy;
use crate::domain::Stage;

/// 按策略执行一次模型调用
///
/// 只重试可重试的错误；第 n 次重试前等待 backoff_ms * n
pub(crate) async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    stage: Stage,
    mut call: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1u32;

    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = policy.backoff_ms.saturating_mul(u64::from(attempt));
                tracing::warn!(
                    stage = %stage,
                    attempt,
                    max_attempts,
                    delay_ms = delay,
                    error = %e,
                    "Model call failed, retrying"
                );
                if delay > 0 {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_retries_transport_errors() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_retry(&policy(3), Stage::Translate, || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ProviderError::Timeout)
            } else {
                Ok("done")
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_default_policy_does_not_retry() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = with_retry(&RetryPolicy::default(), Stage::Analyze, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::Timeout)
        })
        .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_never_retries_configuration_errors() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = with_retry(&policy(5), Stage::Edit, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::Configuration("missing key".into()))
        })
        .await;
        assert!(matches!(result, Err(ProviderError::Configuration(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
