// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use dashmap::DashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, error};
use uuid::Uuid;

use crate::utils::errors::SubscriptionError;

/// 处理结束回调
pub type EndProcessCallback = Arc<dyn Fn() + Send + Sync>;

/// 订阅ID
pub type SubscriptionId = Uuid;

/// 静止通知器
///
/// 保存“所有工作已完成”事件的订阅。每次从忙碌进入静止
/// （队列集合与运行注册表同时为空）只触发一次。
pub struct QuiescenceNotifier {
    subscriptions: DashMap<SubscriptionId, EndProcessCallback>,
    quiescent: AtomicBool,
    ended: Notify,
}

impl Default for QuiescenceNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl QuiescenceNotifier {
    /// 创建通知器，初始状态为静止
    pub fn new() -> Self {
        Self {
            subscriptions: DashMap::new(),
            quiescent: AtomicBool::new(true),
            ended: Notify::new(),
        }
    }

    /// 注册订阅
    ///
    /// # 返回值
    ///
    /// * `Ok(SubscriptionId)` - 用于取消订阅的键
    /// * `Err(SubscriptionError::RegistryFull)` - 无法写入注册表
    pub fn subscribe(&self, callback: EndProcessCallback) -> Result<SubscriptionId, SubscriptionError> {
        let key = Uuid::new_v4();
        match self.subscriptions.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(SubscriptionError::RegistryFull),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(callback);
                debug!(subscription = %key, "End process subscription added");
                Ok(key)
            }
        }
    }

    /// 取消订阅
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 已移除
    /// * `Err(SubscriptionError::InvalidArgument)` - 键为空
    /// * `Err(SubscriptionError::UnknownKey)` - 键不存在
    pub fn unsubscribe(&self, key: SubscriptionId) -> Result<(), SubscriptionError> {
        if key.is_nil() {
            return Err(SubscriptionError::InvalidArgument(
                "The key parameter is required. It cannot be empty".to_string(),
            ));
        }

        self.subscriptions
            .remove(&key)
            .map(|_| ())
            .ok_or(SubscriptionError::UnknownKey(key))
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// 标记为忙碌（有新任务进入）
    pub fn mark_busy(&self) {
        self.quiescent.store(false, Ordering::SeqCst);
    }

    /// 尝试进入静止状态
    ///
    /// 只有从忙碌转为静止的那一次调用返回true
    pub fn try_enter(&self) -> bool {
        self.quiescent
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn is_quiescent(&self) -> bool {
        self.quiescent.load(Ordering::SeqCst)
    }

    /// 调用所有订阅并唤醒等待者
    ///
    /// # 返回值
    ///
    /// 被调用的订阅数量
    pub fn notify_all(&self) -> usize {
        // 先收集，避免回调中订阅/取消订阅时持有分片锁
        let callbacks: Vec<(SubscriptionId, EndProcessCallback)> = self
            .subscriptions
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        for (key, callback) in &callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
                error!(subscription = %key, "End process subscriber panicked");
            }
        }

        self.ended.notify_waiters();
        callbacks.len()
    }

    /// 下一次静止事件
    pub(crate) fn ended(&self) -> &Notify {
        &self.ended
    }
}
