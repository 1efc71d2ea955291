// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;
use uuid::Uuid;

/// 调度器同步错误类型
///
/// 仅在调用方同步调用时返回（入队、构造、等待结果），
/// 单个任务的失败永远通过任务自身的回调传递。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// 请求无效（URL为空、无法解析或缺少必需回调）
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// 当前线程不在 tokio 运行时中
    #[error("Runtime unavailable: {0}")]
    Runtime(String),

    /// 结果通道在送达前被关闭
    #[error("Result channel closed before delivery")]
    Cancelled,
}

/// 订阅注册表错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// 参数无效
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// 订阅键不存在
    #[error("Unknown subscription key: {0}")]
    UnknownKey(Uuid),

    /// 无法写入订阅注册表
    #[error("Unable to add new subscription for end process")]
    RegistryFull,
}

/// 单个任务的终止错误
///
/// 放在 `ScraperResponse::error` 中交给 `on_thrown_exception` 回调。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// 抓取失败（不可重试的错误直接终止）
    #[error("Fetch failed (transient: {transient}): {message}")]
    Fetch { transient: bool, message: String },

    /// 可重试错误已达到最大重试次数
    #[error("Fetch failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    /// 无法从运行注册表中移除执行记录
    #[error("Execution {execution_id} cannot be removed from the running registry: {cause}")]
    RegistryConsistency { execution_id: Uuid, cause: String },
}

impl JobError {
    /// 指标标签
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::Fetch { .. } => "fetch",
            JobError::RetriesExhausted { .. } => "retries_exhausted",
            JobError::RegistryConsistency { .. } => "registry",
        }
    }
}
