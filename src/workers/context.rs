// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use dashmap::DashMap;
use metrics::counter;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::settings::DispatcherSettings;
use crate::domain::services::domain_router::DomainRouter;
use crate::engines::traits::Fetcher;
use crate::queue::{DomainQueue, QueueSet, RunningRegistry};
use crate::utils::retry_policy::RetryPolicy;
use crate::workers::domain_consumer::DomainConsumer;
use crate::workers::quiescence::QuiescenceNotifier;

/// 域名消费者句柄
pub(crate) struct ConsumerHandle {
    pub(crate) id: Uuid,
    pub(crate) handle: JoinHandle<()>,
}

/// 调度器共享状态
///
/// 队列集合、运行注册表和订阅注册表是仅有的共享可变资源。
/// `domain_lock` 串行化队列的创建与移除，以及静止检查。
pub(crate) struct DispatcherContext {
    pub(crate) settings: DispatcherSettings,
    pub(crate) router: DomainRouter,
    pub(crate) fetcher: Arc<dyn Fetcher>,
    pub(crate) queues: QueueSet,
    pub(crate) running: RunningRegistry,
    pub(crate) consumers: DashMap<String, ConsumerHandle>,
    pub(crate) quiescence: QuiescenceNotifier,
    pub(crate) domain_lock: Mutex<()>,
    pub(crate) runtime: Handle,
    can_run: AtomicBool,
    is_running: AtomicBool,
    max_running_by_domain: AtomicUsize,
    max_retry_count: AtomicU32,
    /// 消费者退出或执行记录移除时唤醒 Stop
    activity: Notify,
    /// Stop 时唤醒正在等待的消费者
    stop_signal: Notify,
}

impl DispatcherContext {
    pub(crate) fn new(
        settings: DispatcherSettings,
        router: DomainRouter,
        fetcher: Arc<dyn Fetcher>,
        runtime: Handle,
    ) -> Self {
        Self {
            max_running_by_domain: AtomicUsize::new(settings.max_running_elements_by_domain),
            max_retry_count: AtomicU32::new(settings.max_retry_count),
            settings,
            router,
            fetcher,
            queues: QueueSet::new(),
            running: RunningRegistry::new(),
            consumers: DashMap::new(),
            quiescence: QuiescenceNotifier::new(),
            domain_lock: Mutex::new(()),
            runtime,
            can_run: AtomicBool::new(true),
            is_running: AtomicBool::new(true),
            activity: Notify::new(),
            stop_signal: Notify::new(),
        }
    }

    pub(crate) fn can_run(&self) -> bool {
        self.can_run.load(Ordering::SeqCst)
    }

    pub(crate) fn set_can_run(&self, value: bool) {
        self.can_run.store(value, Ordering::SeqCst);
        if !value {
            self.stop_signal.notify_waiters();
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    pub(crate) fn set_running(&self, value: bool) {
        self.is_running.store(value, Ordering::SeqCst);
    }

    pub(crate) fn max_running_by_domain(&self) -> usize {
        self.max_running_by_domain.load(Ordering::SeqCst)
    }

    pub(crate) fn set_max_running_by_domain(&self, value: usize) {
        self.max_running_by_domain.store(value, Ordering::SeqCst);
    }

    pub(crate) fn max_retry_count(&self) -> u32 {
        self.max_retry_count.load(Ordering::SeqCst)
    }

    pub(crate) fn set_max_retry_count(&self, value: u32) {
        self.max_retry_count.store(value, Ordering::SeqCst);
    }

    /// 当前最大重试次数下的策略快照
    pub(crate) fn retry_policy(&self) -> RetryPolicy {
        self.settings
            .retry_policy()
            .with_max_retries(self.max_retry_count())
    }

    /// 等待指定时间，Stop 时提前返回
    pub(crate) async fn sleep_unless_stopped(&self, duration: Duration) {
        let stopped = self.stop_signal.notified();
        tokio::pin!(stopped);
        stopped.as_mut().enable();
        if !self.can_run() {
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = stopped => {}
        }
    }

    /// 等待队列出现新任务、超时或 Stop
    pub(crate) async fn wait_for_work(&self, queue: &DomainQueue, timeout: Duration) -> bool {
        let stopped = self.stop_signal.notified();
        tokio::pin!(stopped);
        stopped.as_mut().enable();
        if !self.can_run() {
            return !queue.is_empty();
        }

        tokio::select! {
            has_work = queue.wait_for_work(timeout) => has_work,
            _ = stopped => !queue.is_empty(),
        }
    }

    /// 等待消费者退出或执行记录移除
    pub(crate) async fn wait_for_activity(&self, timeout: Duration) {
        let _ = tokio::time::timeout(timeout, self.activity.notified()).await;
    }

    pub(crate) fn notify_activity(&self) {
        self.activity.notify_waiters();
    }

    /// 指定域名是否有仍在运行的消费者
    pub(crate) fn has_active_consumer(&self, domain: &str) -> bool {
        self.consumers
            .get(domain)
            .is_some_and(|consumer| !consumer.handle.is_finished())
    }

    /// 仍在运行的消费者数量
    pub(crate) fn active_consumers(&self) -> usize {
        self.consumers
            .iter()
            .filter(|consumer| !consumer.handle.is_finished())
            .count()
    }

    /// 为队列启动消费者
    ///
    /// 调用方必须持有 `domain_lock`，保证每个域名最多一个消费者。
    pub(crate) fn spawn_consumer(self: &Arc<Self>, queue: Arc<DomainQueue>) {
        let domain = queue.domain().to_string();
        let consumer = DomainConsumer::new(self.clone(), queue);
        let id = consumer.id();
        let handle = self.runtime.spawn(consumer.run());

        debug!(domain = %domain, consumer_id = %id, "Domain consumer spawned");
        self.consumers.insert(domain, ConsumerHandle { id, handle });
    }

    /// 消费者退出
    ///
    /// 在域名锁内确认队列仍为空后将其移除，并注销消费者句柄。
    /// `force` 为false时，如果队列在此期间又有了任务则拒绝退出。
    /// `force` 为true（Stop）时，如果 Start 已在此期间恢复运行且队列有任务，
    /// 同样拒绝退出：Start 看到该消费者仍活跃，不会再启动新的消费者。
    ///
    /// # 返回值
    ///
    /// 消费者是否可以退出
    pub(crate) fn retire_consumer(&self, domain: &str, consumer_id: Uuid, force: bool) -> bool {
        {
            let _guard = self.domain_lock.lock();
            let has_work = self.queues.get(domain).is_some_and(|queue| !queue.is_empty());
            if has_work && (!force || self.can_run()) {
                return false;
            }

            if self.queues.remove_if_empty(domain) {
                info!(domain = %domain, "Domain queue drained and removed");
            }
            self.consumers
                .remove_if(domain, |_, consumer| consumer.id == consumer_id);
        }

        self.notify_activity();
        self.check_quiescence();
        true
    }

    /// 静止检查
    ///
    /// 队列集合与运行注册表同时为空，且此前处于忙碌状态时，通知所有订阅者。
    pub(crate) fn check_quiescence(&self) {
        let entered = {
            let _guard = self.domain_lock.lock();
            self.queues.is_empty() && self.running.is_empty() && self.quiescence.try_enter()
        };

        if entered {
            counter!("fetchrs_quiescence_events_total").increment(1);
            let notified = self.quiescence.notify_all();
            info!(subscribers = notified, "All queued and running work has drained");
        }
    }
}
