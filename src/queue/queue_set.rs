// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use crate::domain::models::DomainJob;

/// 单个域名的任务队列
///
/// 先进先出，支持并发读写。入队时唤醒正在空闲等待的消费者。
#[derive(Debug)]
pub struct DomainQueue {
    domain: String,
    jobs: Mutex<VecDeque<DomainJob>>,
    notify: Notify,
}

impl DomainQueue {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            jobs: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// 追加任务到队尾
    pub fn push_back(&self, job: DomainJob) {
        debug_assert_eq!(job.domain, self.domain);
        self.jobs.lock().push_back(job);
        self.notify.notify_one();
    }

    /// 消费者把未能准入的任务放回队尾，不唤醒等待者
    pub fn requeue(&self, job: DomainJob) {
        self.jobs.lock().push_back(job);
    }

    /// 从队首取出任务
    pub fn pop_front(&self) -> Option<DomainJob> {
        self.jobs.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    /// 等待新任务或超时
    ///
    /// 消费者忙于出队时的入队会留下一个通知许可，被唤醒但队列仍为空时
    /// 继续等待到截止时间，不提前结束本次空闲等待。
    ///
    /// # 返回值
    ///
    /// 等待结束时队列是否有任务
    pub async fn wait_for_work(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if !self.is_empty() {
                return true;
            }
            if tokio::time::timeout_at(deadline, self.notify.notified())
                .await
                .is_err()
            {
                return !self.is_empty();
            }
        }
    }
}

/// 域名队列集合
///
/// 域名键到任务队列的并发映射。创建与移除的“检查后操作”序列
/// 需要调用方持有调度器的域名锁。
#[derive(Debug, Default)]
pub struct QueueSet {
    queues: DashMap<String, Arc<DomainQueue>>,
}

impl QueueSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, domain: &str) -> Option<Arc<DomainQueue>> {
        self.queues.get(domain).map(|entry| entry.value().clone())
    }

    /// 注册新队列
    ///
    /// # 返回值
    ///
    /// 如果该域名已有队列则返回false且不覆盖
    pub fn insert(&self, queue: Arc<DomainQueue>) -> bool {
        match self.queues.entry(queue.domain().to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(queue);
                true
            }
        }
    }

    /// 队列仍为空时将其移除
    ///
    /// # 返回值
    ///
    /// 是否移除了队列
    pub fn remove_if_empty(&self, domain: &str) -> bool {
        self.queues
            .remove_if(domain, |_, queue| queue.is_empty())
            .is_some()
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.queues.contains_key(domain)
    }

    /// 队列数量
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// 所有队列中待处理任务总数
    pub fn total_jobs(&self) -> usize {
        self.queues.iter().map(|entry| entry.value().len()).sum()
    }

    /// 当前所有队列的快照
    pub fn snapshot(&self) -> Vec<Arc<DomainQueue>> {
        self.queues
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}
