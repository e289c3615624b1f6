//! 条件等待
//!
//! 所有"等待页面状态"的操作都通过 `poll_until` 完成：轮询直到条件满足或超时。

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::error::Result;

/// 轮询间隔策略（指数退避，有上限）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub factor: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(250),
            max: Duration::from_secs(2),
            factor: 2,
        }
    }
}

impl PollPolicy {
    /// 固定间隔轮询
    pub fn fixed(interval: Duration) -> Self {
        Self {
            initial: interval,
            max: interval,
            factor: 1,
        }
    }

    fn next(&self, current: Duration) -> Duration {
        current.saturating_mul(self.factor.max(1)).min(self.max)
    }
}

/// 轮询直到 `probe` 返回 `Some`，或者超时返回 `None`
///
/// 至少执行一次探测；`probe` 返回的错误会立即向上传播。
pub async fn poll_until<T, F, Fut>(timeout: Duration, policy: PollPolicy, mut probe: F) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    // 超大超时值无法表示为时刻时不设截止时间
    let deadline = Instant::now().checked_add(timeout);
    let mut interval = policy.initial;

    loop {
        if let Some(value) = probe().await? {
            return Ok(Some(value));
        }

        let pause = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(None);
                }
                interval.min(deadline - now)
            }
            None => interval,
        };
        sleep(pause).await;
        interval = policy.next(interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PublishError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn returns_value_once_condition_holds() {
        let calls = AtomicU32::new(0);
        let found = poll_until(Duration::from_secs(1), PollPolicy::fixed(Duration::from_millis(1)), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok((n >= 3).then_some(n))
        })
        .await
        .unwrap();
        assert_eq!(found, Some(3));
    }

    #[tokio::test]
    async fn zero_timeout_still_probes_once() {
        let calls = AtomicU32::new(0);
        let found: Option<()> = poll_until(Duration::ZERO, PollPolicy::default(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        })
        .await
        .unwrap();
        assert!(found.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unrepresentable_timeout_does_not_panic() {
        let calls = AtomicU32::new(0);
        let found = poll_until(Duration::MAX, PollPolicy::fixed(Duration::from_millis(1)), || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok((n >= 2).then_some(n))
        })
        .await
        .unwrap();
        assert_eq!(found, Some(2));
    }

    #[tokio::test]
    async fn errors_stop_polling() {
        let result: Result<Option<()>> = poll_until(Duration::from_secs(5), PollPolicy::default(), || async {
            Err(PublishError::SessionBroken { reason: "closed".into() })
        })
        .await;
        assert!(matches!(result, Err(PublishError::SessionBroken { .. })));
    }
}
