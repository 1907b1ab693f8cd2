//! 고정 딜레이 재시도 정책.
//!
//! 외부 API 호출을 제한된 횟수만큼 재시도합니다. 요청 한도 초과(429)도
//! 일시적 네트워크 에러와 같은 예산을 소모합니다.
//!
//! ```rust,ignore
//! let config = RetryConfig::new(3, Duration::from_secs(3));
//! let body = with_retry(&config, "listing", || client.get_page(&url)).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::PipelineError;

/// 재시도 설정.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// 최초 시도를 포함한 최대 시도 횟수
    pub max_attempts: u32,
    /// 시도 간 고정 딜레이 (밀리초)
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 3_000,
        }
    }
}

impl RetryConfig {
    /// 새 재시도 설정을 생성합니다.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay_ms: delay.as_millis() as u64,
        }
    }

    /// 재시도하지 않는 설정 (1회 시도).
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            delay_ms: 0,
        }
    }

    /// 시도 간 딜레이.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// 재시도 가능한 [`PipelineError`]에 대해서만 재시도합니다.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    operation_name: &str,
    operation: F,
) -> Result<T, PipelineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PipelineError>>,
{
    with_retry_if(config, operation_name, operation, PipelineError::is_retryable).await
}

/// `should_retry`가 참인 에러에 대해 최대 `max_attempts`번까지 시도합니다.
///
/// 마지막 시도의 에러를 그대로 반환합니다. 마지막 실패 뒤에는 대기하지 않습니다.
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = config.attempts();
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        "재시도 후 성공"
                    );
                }
                return Ok(value);
            }
            Err(e) if attempt < max_attempts && should_retry(&e) => {
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts,
                    error = %e,
                    "요청 실패, 재시도 대기"
                );
                attempt += 1;
                tokio::time::sleep(config.delay()).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig::new(max_attempts, Duration::from_secs(3))
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_twice_then_succeeds() {
        let calls = AtomicU32::new(0);

        let result = with_retry(&fast_config(3), "flaky", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(PipelineError::TransientNetwork("timeout".to_string()))
            } else {
                Ok("payload")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "payload");
        // 최초 시도 1회 + 재시도 정확히 2회
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_consumes_same_budget() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = with_retry(&fast_config(3), "limited", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(PipelineError::RateLimited("429".to_string()))
        })
        .await;

        assert!(matches!(result, Err(PipelineError::RateLimited(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_fails_immediately() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = with_retry(&fast_config(3), "not_found", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(PipelineError::Http {
                status: 404,
                url: "/missing".to_string(),
            })
        })
        .await;

        assert!(matches!(result, Err(PipelineError::Http { status: 404, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_fixed_delay_between_attempts() {
        let start = tokio::time::Instant::now();
        let calls = AtomicU32::new(0);

        let _ = with_retry(&fast_config(3), "slow", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(PipelineError::TransientNetwork("reset".to_string()))
            } else {
                Ok(())
            }
        })
        .await;

        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::new(0, Duration::ZERO);

        let _: Result<(), _> = with_retry(&config, "zero", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(PipelineError::TransientNetwork("down".to_string()))
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
