// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::counter;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::queue::DomainQueue;
use crate::workers::context::DispatcherContext;
use crate::workers::fetch_executor::FetchExecutor;

/// 域名消费者状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConsumerState {
    /// 正在出队
    Draining,
    /// 域名达到并发上限，退避等待
    Throttled,
    /// 队列为空，计数等待
    Idle,
    /// 已退出
    Terminated,
}

impl fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConsumerState::Draining => write!(f, "draining"),
            ConsumerState::Throttled => write!(f, "throttled"),
            ConsumerState::Idle => write!(f, "idle"),
            ConsumerState::Terminated => write!(f, "terminated"),
        }
    }
}

/// 域名消费者
///
/// 每个活跃域名一个。从域名队列出队，按运行注册表做准入控制，
/// 为每个准入的任务启动一个抓取执行器，不等待其完成。
/// 队列持续为空一段时间后自行退出并移除队列。
pub(crate) struct DomainConsumer {
    ctx: Arc<DispatcherContext>,
    queue: Arc<DomainQueue>,
    id: Uuid,
    state: ConsumerState,
    throttled_count: u32,
    empty_count: u32,
}

impl DomainConsumer {
    pub(crate) fn new(ctx: Arc<DispatcherContext>, queue: Arc<DomainQueue>) -> Self {
        Self {
            ctx,
            queue,
            id: Uuid::new_v4(),
            state: ConsumerState::Draining,
            throttled_count: 0,
            empty_count: 0,
        }
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    fn domain(&self) -> &str {
        self.queue.domain()
    }

    /// 运行消费循环直到退出
    pub(crate) async fn run(mut self) {
        info!(domain = %self.domain(), consumer_id = %self.id, "Domain consumer started");

        while self.state != ConsumerState::Terminated {
            if !self.ctx.can_run() {
                // 停止时不再出队，剩余任务留给下一次 Start
                if self.ctx.retire_consumer(self.queue.domain(), self.id, true) {
                    self.state = ConsumerState::Terminated;
                    break;
                }
                // Start 在退出前恢复了运行
                self.state = ConsumerState::Draining;
                continue;
            }

            let next = self.step().await;
            if next != self.state {
                trace!(domain = %self.domain(), from = %self.state, to = %next, "Consumer state changed");
            }
            self.state = next;
        }

        info!(domain = %self.domain(), consumer_id = %self.id, "Domain consumer terminated");
    }

    async fn step(&mut self) -> ConsumerState {
        match self.state {
            ConsumerState::Draining => self.drain_one(),
            ConsumerState::Throttled => {
                let delay = self.ctx.retry_policy().throttle_delay(self.throttled_count);
                self.ctx.sleep_unless_stopped(delay).await;
                ConsumerState::Draining
            }
            ConsumerState::Idle => self.idle().await,
            ConsumerState::Terminated => ConsumerState::Terminated,
        }
    }

    /// 出队一个任务并尝试准入
    fn drain_one(&mut self) -> ConsumerState {
        let Some(job) = self.queue.pop_front() else {
            return ConsumerState::Idle;
        };
        self.empty_count = 0;

        let domain = self.queue.domain();
        let limit = self.ctx.max_running_by_domain();
        if self.ctx.running.count_for(domain) >= limit {
            // 放回队尾，严格FIFO在节流时不保证
            self.throttled_count += 1;
            self.queue.requeue(job);
            counter!("fetchrs_jobs_throttled_total").increment(1);
            debug!(
                domain = %domain,
                limit,
                throttled = self.throttled_count,
                "Domain at running limit, throttling"
            );
            return ConsumerState::Throttled;
        }
        self.throttled_count = 0;

        let execution_id = Uuid::new_v4();
        if !self.ctx.running.try_insert(execution_id, domain) {
            debug!(domain = %domain, execution_id = %execution_id, "Execution id collision, requeueing");
            self.queue.requeue(job);
            return ConsumerState::Draining;
        }

        counter!("fetchrs_jobs_admitted_total").increment(1);
        let executor = FetchExecutor::new(self.ctx.clone(), job, execution_id);
        self.ctx.runtime.spawn(executor.run());

        ConsumerState::Draining
    }

    /// 空闲等待，达到上限后尝试退出
    async fn idle(&mut self) -> ConsumerState {
        if self.empty_count >= self.ctx.settings.max_idle_polls {
            if self.ctx.retire_consumer(self.queue.domain(), self.id, false) {
                return ConsumerState::Terminated;
            }
            // 退出前又有新任务
            self.empty_count = 0;
            return ConsumerState::Draining;
        }

        self.empty_count += 1;
        let interval = self.ctx.settings.idle_poll_interval();
        if self.ctx.wait_for_work(&self.queue, interval).await {
            ConsumerState::Draining
        } else {
            ConsumerState::Idle
        }
    }
}
