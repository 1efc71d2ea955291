// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::counter;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::config::settings::DispatcherSettings;
use crate::domain::models::{ScraperRequest, ScraperResponse};
use crate::domain::services::domain_router::DomainRouter;
use crate::engines::traits::Fetcher;
use crate::queue::DomainQueue;
use crate::utils::errors::{DispatchError, SubscriptionError};
use crate::workers::context::DispatcherContext;
use crate::workers::quiescence::SubscriptionId;

/// 抓取调度器
///
/// 按域名对请求分组，限制每个域名同时执行的请求数，重试临时错误，
/// 通过回调交付结果，并在所有工作完成时通知订阅者。
///
/// 每个进程只应创建一个实例，通过克隆句柄共享。创建后即处于运行状态。
#[derive(Clone)]
pub struct Dispatcher {
    ctx: Arc<DispatcherContext>,
}

impl Dispatcher {
    /// 在当前 tokio 运行时中创建调度器
    ///
    /// # 参数
    ///
    /// * `settings` - 调度器配置
    /// * `fetcher` - 抓取能力
    ///
    /// # 返回值
    ///
    /// * `Ok(Dispatcher)` - 创建成功
    /// * `Err(DispatchError::Runtime)` - 不在 tokio 运行时中
    /// * `Err(DispatchError::InvalidRequest)` - 配置的基础URL无效
    pub fn new(settings: DispatcherSettings, fetcher: Arc<dyn Fetcher>) -> Result<Self, DispatchError> {
        let runtime = Handle::try_current().map_err(|e| DispatchError::Runtime(e.to_string()))?;
        Self::with_runtime(settings, fetcher, runtime)
    }

    /// 使用指定运行时创建调度器，允许从非异步线程入队
    pub fn with_runtime(
        settings: DispatcherSettings,
        fetcher: Arc<dyn Fetcher>,
        runtime: Handle,
    ) -> Result<Self, DispatchError> {
        let router = match settings.base_url.as_deref() {
            Some(base_url) => DomainRouter::with_base_url(base_url)?,
            None => DomainRouter::new(),
        };

        info!(
            fetcher = fetcher.name(),
            max_running_by_domain = settings.max_running_elements_by_domain,
            max_retry_count = settings.max_retry_count,
            "Dispatcher created"
        );

        Ok(Self {
            ctx: Arc::new(DispatcherContext::new(settings, router, fetcher, runtime)),
        })
    }

    /// 入队一个抓取请求
    ///
    /// 已有该域名队列时追加任务；否则创建队列并启动该域名的消费者。
    /// 创建过程在域名锁内完成，并发入队同一新域名只会启动一个消费者。
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 已入队
    /// * `Err(DispatchError::InvalidRequest)` - URL为空或无效，或缺少 `on_data_arrived`
    pub fn enqueue(&self, request: ScraperRequest) -> Result<(), DispatchError> {
        let job = self.ctx.router.resolve(request)?;
        let domain = job.domain.clone();

        {
            let _guard = self.ctx.domain_lock.lock();
            self.ctx.quiescence.mark_busy();

            let queue = match self.ctx.queues.get(&domain) {
                Some(queue) => {
                    queue.push_back(job);
                    queue
                }
                None => {
                    let queue = Arc::new(DomainQueue::new(domain.clone()));
                    queue.push_back(job);
                    self.ctx.queues.insert(queue.clone());
                    debug!(domain = %domain, "Domain queue created");
                    queue
                }
            };

            if self.ctx.can_run() && !self.ctx.has_active_consumer(&domain) {
                self.ctx.spawn_consumer(queue);
            }
        }

        counter!("fetchrs_jobs_enqueued_total", "domain" => domain).increment(1);
        Ok(())
    }

    /// 入队并等待终止结果
    ///
    /// 请求上已有的回调仍会被调用。成功时返回带负载的响应，
    /// 失败时返回带错误的响应。
    pub async fn fetch(&self, request: ScraperRequest) -> Result<ScraperResponse, DispatchError> {
        let (tx, rx) = oneshot::channel();
        let sender = Arc::new(Mutex::new(Some(tx)));

        let on_data = request.on_data_arrived.clone();
        let on_error = request.on_thrown_exception.clone();
        let data_sender = sender.clone();
        let error_sender = sender;

        let request = request
            .on_data_arrived(move |response| {
                if let Some(callback) = &on_data {
                    callback(response.clone());
                }
                if let Some(tx) = data_sender.lock().take() {
                    let _ = tx.send(response);
                }
            })
            .on_thrown_exception(move |response| {
                if let Some(callback) = &on_error {
                    callback(response.clone());
                }
                if let Some(tx) = error_sender.lock().take() {
                    let _ = tx.send(response);
                }
            });

        self.enqueue(request)?;
        rx.await.map_err(|_| DispatchError::Cancelled)
    }

    /// 启动处理
    ///
    /// 为每个没有活跃消费者的已注册队列启动消费者。重复调用无副作用。
    pub fn start(&self) {
        self.ctx.set_can_run(true);

        let _guard = self.ctx.domain_lock.lock();
        self.ctx.set_running(true);
        for queue in self.ctx.queues.snapshot() {
            if !self.ctx.has_active_consumer(queue.domain()) {
                self.ctx.spawn_consumer(queue);
            }
        }
        info!(queues = self.ctx.queues.len(), "Dispatcher started");
    }

    /// 停止处理
    ///
    /// 消费者停止出队并退出，执行中的抓取允许完成（包括重试）。
    /// 在没有活跃消费者且运行注册表为空后返回。队列中的任务保留到下次 `start`。
    pub async fn stop(&self) {
        info!("Stopping dispatcher");
        self.ctx.set_can_run(false);

        let interval = self.ctx.settings.stop_poll_interval();
        loop {
            let consumers = self.ctx.active_consumers();
            let running = self.ctx.running.len();
            if consumers == 0 && running == 0 {
                break;
            }
            debug!(consumers, running, "Waiting for consumers and running fetches");
            self.ctx.wait_for_activity(interval).await;
        }

        {
            let _guard = self.ctx.domain_lock.lock();
            self.ctx
                .consumers
                .retain(|_, consumer| !consumer.handle.is_finished());
            if !self.ctx.can_run() {
                self.ctx.set_running(false);
            }
        }
        info!(pending = self.ctx.queues.total_jobs(), "Dispatcher stopped");
    }

    /// 订阅处理结束事件
    ///
    /// 每当队列集合与运行注册表同时变为空时调用
    pub fn subscribe_to_end_process<F>(&self, callback: F) -> Result<SubscriptionId, SubscriptionError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.ctx.quiescence.subscribe(Arc::new(callback))
    }

    /// 取消订阅处理结束事件
    pub fn unsubscribe_to_end_process(&self, key: SubscriptionId) -> Result<(), SubscriptionError> {
        self.ctx.quiescence.unsubscribe(key)
    }

    /// 等待所有工作完成
    ///
    /// 当前已静止时立即返回
    pub async fn wait_until_ended(&self) {
        loop {
            let ended = self.ctx.quiescence.ended().notified();
            tokio::pin!(ended);
            ended.as_mut().enable();

            if self.is_ended() {
                return;
            }
            ended.await;
        }
    }

    /// 执行中的请求数量
    pub fn current_running_size(&self) -> usize {
        self.ctx.running.len()
    }

    /// 按域名统计的执行中请求数量
    pub fn current_running_size_by_domain(&self) -> HashMap<String, usize> {
        self.ctx.running.counts_by_domain()
    }

    /// 所有队列中待处理的任务数量
    pub fn current_queue_size(&self) -> usize {
        self.ctx.queues.total_jobs()
    }

    /// 域名队列数量
    pub fn current_queue_count(&self) -> usize {
        self.ctx.queues.len()
    }

    /// 活跃的域名消费者数量
    pub fn current_consumer_count(&self) -> usize {
        self.ctx.active_consumers()
    }

    /// 队列集合与运行注册表是否都为空
    pub fn is_ended(&self) -> bool {
        self.ctx.queues.is_empty() && self.ctx.running.is_empty()
    }

    /// 是否处于运行状态（未被 Stop）
    pub fn is_active(&self) -> bool {
        self.ctx.is_running()
    }

    pub fn max_running_elements_by_domain(&self) -> usize {
        self.ctx.max_running_by_domain()
    }

    pub fn set_max_running_elements_by_domain(&self, value: usize) {
        self.ctx.set_max_running_by_domain(value);
    }

    pub fn max_retry_count(&self) -> u32 {
        self.ctx.max_retry_count()
    }

    pub fn set_max_retry_count(&self, value: u32) {
        self.ctx.set_max_retry_count(value);
    }
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;
