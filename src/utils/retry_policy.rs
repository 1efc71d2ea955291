// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::time::Duration;

/// 重试与节流策略
///
/// 抓取重试使用固定延迟；域名达到并发上限时的节流延迟
/// 随连续节流次数线性增长，成功准入后归零。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最大重试次数
    pub max_retries: u32,
    /// 两次重试之间的固定延迟
    pub retry_delay: Duration,
    /// 节流延迟步长
    pub throttle_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_delay: Duration::from_secs(2),
            throttle_step: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    /// 使用指定的最大重试次数创建策略
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// 是否应该重试
    ///
    /// `attempt` 为已经完成的重试次数（首次尝试为 0）
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// 下次重试前的等待时间
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// 计算第 `consecutive` 次连续节流的等待时间
    pub fn throttle_delay(&self, consecutive: u32) -> Duration {
        self.throttle_step.saturating_mul(consecutive)
    }
}
