//! 답변 호출 재시도 정책 - 시도마다 타임아웃이 늘어나는 유한 루프
//!
//! 시도 `i`(0부터)의 타임아웃은 `base + increment × i` 입니다.
//! 실패 원인(타임아웃, 전송 오류, 비정상 상태 코드)과 무관하게 같은 일정을 따릅니다.

use std::future::Future;
use std::time::Duration;

use crate::error::{EvalError, Result};

/// 기본 최대 시도 횟수
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// 기본 첫 시도 타임아웃 (초)
pub const DEFAULT_BASE_TIMEOUT_SECS: u64 = 180;

/// 재시도마다 늘어나는 타임아웃 (초)
pub const DEFAULT_TIMEOUT_INCREMENT_SECS: u64 = 60;

/// 답변 재시도 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerRetryPolicy {
    pub max_attempts: u32,
    pub base_timeout: Duration,
    pub timeout_increment: Duration,
}

impl Default for AnswerRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_timeout: Duration::from_secs(DEFAULT_BASE_TIMEOUT_SECS),
            timeout_increment: Duration::from_secs(DEFAULT_TIMEOUT_INCREMENT_SECS),
        }
    }
}

impl AnswerRetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// 시도 `attempt`(0부터)의 타임아웃
    pub fn timeout_for(&self, attempt: u32) -> Duration {
        self.base_timeout + self.timeout_increment * attempt
    }

    /// 전체 타임아웃 일정
    pub fn schedule(&self) -> Vec<Duration> {
        (0..self.max_attempts).map(|a| self.timeout_for(a)).collect()
    }

    /// 정책에 따라 `op`를 실행
    ///
    /// `op`는 시도 번호와 해당 타임아웃을 받습니다. 첫 성공을 그대로 돌려주고,
    /// 모든 시도가 실패하면 마지막 원인을 담은 `AnswerFailure`를 반환합니다.
    pub async fn run<F, Fut, T>(&self, mut op: F) -> Result<T>
    where
        F: FnMut(u32, Duration) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_reason = String::from("no attempts were made");

        for attempt in 0..self.max_attempts {
            let timeout = self.timeout_for(attempt);
            tracing::info!(
                "Answer attempt {}/{} (timeout: {}s)",
                attempt + 1,
                self.max_attempts,
                timeout.as_secs()
            );

            match op(attempt, timeout).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    last_reason = describe_failure(&e, timeout);
                    if attempt + 1 < self.max_attempts {
                        tracing::warn!(
                            "Answer attempt {}/{} failed: {}, retrying with {}s timeout",
                            attempt + 1,
                            self.max_attempts,
                            last_reason,
                            self.timeout_for(attempt + 1).as_secs()
                        );
                    } else {
                        tracing::warn!(
                            "Answer attempt {}/{} failed: {}",
                            attempt + 1,
                            self.max_attempts,
                            last_reason
                        );
                    }
                }
            }
        }

        Err(EvalError::AnswerFailure {
            attempts: self.max_attempts,
            reason: last_reason,
        })
    }
}

fn describe_failure(error: &EvalError, timeout: Duration) -> String {
    match error {
        EvalError::Http(e) if e.is_timeout() => format!("timeout after {}s", timeout.as_secs()),
        other => other.to_string(),
    }
}
