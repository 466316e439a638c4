//! 고정 간격 재시도 — 최종 일관성(eventually consistent) 상태 관찰용
//!
//! [`retry_with_fixed_delay`]는 시도 횟수 상한, 고정 대기 간격, 재시도 판정 함수를
//! 받아 비동기 작업을 반복합니다. 재시도를 포기하는 정책은 이 모듈 한 곳에만 있습니다.
//!
//! # 시도 횟수 규칙
//! - `max_attempts = 0` → 한 번만 시도, 대기 없음
//! - `max_attempts = N` → 최대 `N`번 시도, 최대 `N-1`번 대기

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// 재시도 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 최대 시도 횟수 (0은 1회로 취급)
    pub max_attempts: u32,
    /// 시도 간 고정 대기 시간
    pub interval: Duration,
}

impl RetryPolicy {
    /// 재시도 없이 한 번만 시도하는 정책
    pub fn once() -> Self {
        Self {
            max_attempts: 0,
            interval: Duration::ZERO,
        }
    }

    /// 고정 간격 재시도 정책
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// 실제로 수행될 최대 시도 횟수
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// 모든 시도가 실패할 때까지의 최대 누적 대기 시간
    pub fn max_total_wait(&self) -> Duration {
        self.interval * (self.attempts() - 1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::once()
    }
}

/// 고정 간격으로 비동기 작업을 재시도합니다.
///
/// `operation`은 1부터 시작하는 시도 번호를 받습니다. 작업이 실패하면
/// `should_retry`가 `true`를 반환하고 시도가 남아 있을 때만 대기 후 다시 시도합니다.
/// 그 외에는 마지막 에러를 그대로 반환합니다.
///
/// # Arguments
/// * `policy` - 시도 횟수와 대기 간격
/// * `operation_name` - 로그용 작업 이름
/// * `should_retry` - 에러가 일시적인지 판정하는 함수
/// * `operation` - 재시도할 비동기 작업
pub async fn retry_with_fixed_delay<F, Fut, T, E, P>(
    policy: &RetryPolicy,
    operation_name: &str,
    should_retry: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let attempts = policy.attempts();
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(value) => {
                debug!(
                    operation = %operation_name,
                    attempt = attempt,
                    "operation succeeded"
                );
                return Ok(value);
            }
            Err(e) => {
                if attempt >= attempts || !should_retry(&e) {
                    return Err(e);
                }

                warn!(
                    operation = %operation_name,
                    attempt = attempt,
                    max_attempts = attempts,
                    error = %e,
                    delay_ms = u64::try_from(policy.interval.as_millis()).unwrap_or(u64::MAX),
                    "operation failed, retrying"
                );

                tokio::time::sleep(policy.interval).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn attempts_treats_zero_as_one() {
        assert_eq!(RetryPolicy::once().attempts(), 1);
        assert_eq!(RetryPolicy::fixed(0, Duration::from_secs(5)).attempts(), 1);
        assert_eq!(RetryPolicy::fixed(12, Duration::from_secs(5)).attempts(), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_immediately_without_sleeping() {
        let start = Instant::now();
        let policy = RetryPolicy::fixed(5, Duration::from_secs(5));
        let result: Result<i32, &str> =
            retry_with_fixed_delay(&policy, "op", |_: &&str| true, |_| async { Ok(7) }).await;
        assert_eq!(result, Ok(7));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_failures() {
        let count = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&count);
        let policy = RetryPolicy::fixed(5, Duration::from_secs(1));

        let result: Result<u32, &str> = retry_with_fixed_delay(
            &policy,
            "op",
            |_: &&str| true,
            |attempt| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    if attempt < 3 { Err("not yet") } else { Ok(attempt) }
                }
            },
        )
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_attempts_and_sleeps_n_minus_one_times() {
        let count = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&count);
        let policy = RetryPolicy::fixed(4, Duration::from_secs(5));
        let start = Instant::now();

        let result: Result<(), String> = retry_with_fixed_delay(
            &policy,
            "op",
            |_: &String| true,
            |attempt| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(format!("attempt {attempt} failed"))
                }
            },
        )
        .await;

        assert_eq!(result, Err("attempt 4 failed".to_owned()));
        assert_eq!(count.load(Ordering::SeqCst), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_tries_once_and_never_sleeps() {
        let count = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&count);
        let policy = RetryPolicy::fixed(0, Duration::from_secs(5));
        let start = Instant::now();

        let result: Result<(), &str> = retry_with_fixed_delay(
            &policy,
            "op",
            |_: &&str| true,
            |_| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err("missing")
                }
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_error_stops_immediately() {
        let count = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&count);
        let policy = RetryPolicy::fixed(10, Duration::from_secs(5));
        let start = Instant::now();

        let result: Result<(), &str> = retry_with_fixed_delay(
            &policy,
            "op",
            |e: &&str| *e != "fatal",
            |_| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err("fatal")
                }
            },
        )
        .await;

        assert_eq!(result, Err("fatal"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
