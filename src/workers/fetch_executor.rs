// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use metrics::{counter, histogram};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::models::{DomainJob, Payload, ResponseCallback, ScraperResponse};
use crate::utils::errors::JobError;
use crate::workers::context::DispatcherContext;

const REGISTRY_REMOVAL_FAILURE: &str =
    "The scraper data response cannot be deleted from running collection.";

/// 抓取执行器
///
/// 对一个已准入的任务执行抓取，可重试错误按固定延迟重试，
/// 每次尝试前调用 `on_dequeue`，重试期间执行ID保持在运行注册表中。终止时移除执行记录，
/// 并且只调用 `on_data_arrived` 或 `on_thrown_exception` 中的一个，恰好一次。
pub(crate) struct FetchExecutor {
    ctx: Arc<DispatcherContext>,
    job: DomainJob,
    execution_id: Uuid,
}

impl FetchExecutor {
    pub(crate) fn new(ctx: Arc<DispatcherContext>, job: DomainJob, execution_id: Uuid) -> Self {
        Self {
            ctx,
            job,
            execution_id,
        }
    }

    /// 执行直到终止结果
    #[instrument(
        skip(self),
        fields(domain = %self.job.domain, execution_id = %self.execution_id, url = %self.job.uri)
    )]
    pub(crate) async fn run(self) {
        let outcome = self.fetch_with_retry().await;
        self.complete(outcome);
    }

    async fn fetch_with_retry(&self) -> Result<Payload, JobError> {
        let request = &self.job.request;
        let mut attempt: u32 = 0;

        loop {
            // 每次尝试前都通知出队，重试也不例外
            invoke(request.on_dequeue.as_ref(), self.job.snapshot(), "on_dequeue");

            let started = Instant::now();
            let result = self
                .ctx
                .fetcher
                .fetch(&self.job.uri, request.proxy.as_ref(), request.scraper_type)
                .await;
            histogram!("fetchrs_fetch_duration_seconds").record(started.elapsed().as_secs_f64());

            let err = match result {
                Ok(payload) => return Ok(payload),
                Err(err) => err,
            };

            if !err.is_transient() {
                warn!(attempt, error = %err, "Fetch failed with non-transient error");
                return Err(JobError::Fetch {
                    transient: false,
                    message: err.to_string(),
                });
            }

            // 每次都读取最新的最大重试次数
            let policy = self.ctx.retry_policy();
            if !policy.should_retry(attempt) {
                warn!(attempt, error = %err, "Fetch retries exhausted");
                return Err(JobError::RetriesExhausted {
                    attempts: attempt + 1,
                    message: err.to_string(),
                });
            }

            attempt += 1;
            counter!("fetchrs_fetch_retries_total").increment(1);
            info!(attempt, error = %err, "Transient fetch failure, retrying");
            tokio::time::sleep(policy.retry_delay()).await;
        }
    }

    /// 终止步骤：移除执行记录、调用结果回调、静止检查
    fn complete(self, outcome: Result<Payload, JobError>) {
        let release = self.release();
        let response = self.job.snapshot();
        let request = &self.job.request;

        match (outcome, release) {
            (Ok(payload), Ok(())) => {
                counter!("fetchrs_jobs_succeeded_total").increment(1);
                invoke(
                    request.on_data_arrived.as_ref(),
                    response.with_payload(payload),
                    "on_data_arrived",
                );
            }
            (Ok(_), Err(registry_error)) => {
                error!(error = %registry_error, "Fetched payload discarded after registry failure");
                self.deliver_failure(response, registry_error);
            }
            (Err(job_error), Ok(())) => self.deliver_failure(response, job_error),
            (Err(job_error), Err(JobError::RegistryConsistency { execution_id, cause })) => {
                let error = JobError::RegistryConsistency {
                    execution_id,
                    cause: format!("{} ({})", cause, job_error),
                };
                self.deliver_failure(response, error);
            }
            (Err(_), Err(other)) => self.deliver_failure(response, other),
        }

        self.ctx.notify_activity();
        self.ctx.check_quiescence();
    }

    /// 从运行注册表移除执行记录，最多重试 `max_retry_count` 次
    fn release(&self) -> Result<(), JobError> {
        let attempts = self.ctx.max_retry_count().saturating_add(1);
        for _ in 0..attempts {
            if self.ctx.running.remove(&self.execution_id).is_some() {
                return Ok(());
            }
        }

        Err(JobError::RegistryConsistency {
            execution_id: self.execution_id,
            cause: REGISTRY_REMOVAL_FAILURE.to_string(),
        })
    }

    fn deliver_failure(&self, response: ScraperResponse, error: JobError) {
        counter!("fetchrs_jobs_failed_total", "kind" => error.kind()).increment(1);

        let callback = self.job.request.on_thrown_exception.as_ref();
        if callback.is_none() {
            warn!(error = %error, "Job failed with no exception callback registered");
            return;
        }
        invoke(callback, response.with_error(error), "on_thrown_exception");
    }
}

/// 调用回调，捕获回调中的panic
///
/// # 返回值
///
/// 是否存在该回调
fn invoke(callback: Option<&ResponseCallback>, response: ScraperResponse, event: &'static str) -> bool {
    let Some(callback) = callback else {
        return false;
    };

    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(response))) {
        error!(event, panic = %panic_message(payload.as_ref()), "Callback panicked");
    }
    true
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
