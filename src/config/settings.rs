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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::utils::retry_policy::RetryPolicy;

/// 应用程序配置设置
///
/// 包含调度器、抓取器、日志和指标等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 调度器配置
    pub dispatcher: DispatcherSettings,
    /// 抓取器配置
    pub fetcher: FetcherSettings,
    /// 日志配置
    pub telemetry: TelemetrySettings,
    /// 指标配置
    pub metrics: MetricsSettings,
}

/// 调度器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct DispatcherSettings {
    /// 每个域名同时运行的最大请求数
    pub max_running_elements_by_domain: usize,
    /// 最大重试次数
    pub max_retry_count: u32,
    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,
    /// 节流延迟步长（毫秒）
    pub throttle_step_ms: u64,
    /// 空队列轮询间隔（毫秒）
    pub idle_poll_interval_ms: u64,
    /// 消费者退出前允许的连续空轮询次数
    pub max_idle_polls: u32,
    /// Stop 等待轮询间隔（毫秒）
    pub stop_poll_interval_ms: u64,
    /// 解析相对URL使用的基础URL
    pub base_url: Option<String>,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            max_running_elements_by_domain: 40,
            max_retry_count: 5,
            retry_delay_ms: 2000,
            throttle_step_ms: 50,
            idle_poll_interval_ms: 3000,
            max_idle_polls: 5,
            stop_poll_interval_ms: 2000,
            base_url: None,
        }
    }
}

impl DispatcherSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retry_count,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            throttle_step: Duration::from_millis(self.throttle_step_ms),
        }
    }

    pub fn idle_poll_interval(&self) -> Duration {
        Duration::from_millis(self.idle_poll_interval_ms)
    }

    pub fn stop_poll_interval(&self) -> Duration {
        Duration::from_millis(self.stop_poll_interval_ms)
    }
}

/// 抓取器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherSettings {
    /// User-Agent 请求头
    pub user_agent: String,
    /// 单次请求超时时间（秒）
    pub timeout_secs: u64,
    /// 是否接受无效证书
    pub accept_invalid_certs: bool,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (compatible; fetchrs/0.1)".to_string(),
            timeout_secs: 30,
            accept_invalid_certs: false,
        }
    }
}

/// 日志配置设置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelemetrySettings {
    /// 是否输出JSON格式日志
    pub json: bool,
    /// 日志过滤器，例如 `info,fetchrs=debug`
    pub filter: Option<String>,
}

/// 指标配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// 是否启用Prometheus导出器
    pub enabled: bool,
    /// 导出器监听地址
    pub listen_addr: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "0.0.0.0:9000".to_string(),
        }
    }
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从配置文件和环境变量加载配置，支持默认值
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        Self::builder()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("FETCHRS").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// 仅使用默认值构建配置
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::builder()?.build()?.try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let dispatcher = DispatcherSettings::default();
        let fetcher = FetcherSettings::default();
        let metrics = MetricsSettings::default();

        Config::builder()
            // Dispatcher defaults
            .set_default(
                "dispatcher.max_running_elements_by_domain",
                dispatcher.max_running_elements_by_domain as u64,
            )?
            .set_default(
                "dispatcher.max_retry_count",
                u64::from(dispatcher.max_retry_count),
            )?
            .set_default("dispatcher.retry_delay_ms", dispatcher.retry_delay_ms)?
            .set_default("dispatcher.throttle_step_ms", dispatcher.throttle_step_ms)?
            .set_default(
                "dispatcher.idle_poll_interval_ms",
                dispatcher.idle_poll_interval_ms,
            )?
            .set_default(
                "dispatcher.max_idle_polls",
                u64::from(dispatcher.max_idle_polls),
            )?
            .set_default(
                "dispatcher.stop_poll_interval_ms",
                dispatcher.stop_poll_interval_ms,
            )?
            // Fetcher defaults
            .set_default("fetcher.user_agent", fetcher.user_agent)?
            .set_default("fetcher.timeout_secs", fetcher.timeout_secs)?
            .set_default("fetcher.accept_invalid_certs", fetcher.accept_invalid_certs)?
            // Telemetry defaults
            .set_default("telemetry.json", false)?
            // Metrics defaults
            .set_default("metrics.enabled", metrics.enabled)?
            .set_default("metrics.listen_addr", metrics.listen_addr)
    }
}
