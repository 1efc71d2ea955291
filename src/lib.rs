// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理调度器、抓取器、日志和指标的配置与环境变量
pub mod config;

/// 领域模块
///
/// 包含抓取请求、响应模型和域名路由
pub mod domain;

/// 引擎模块
///
/// 定义抓取能力接口及基于 reqwest 的实现
pub mod engines;

/// 基础设施模块
///
/// 提供指标导出
pub mod infrastructure;

/// 队列模块
///
/// 实现按域名分组的任务队列和运行注册表
pub mod queue;

/// 工具模块
///
/// 提供错误类型、重试策略、日志初始化和URL辅助函数
pub mod utils;

/// 工作器模块
///
/// 实现调度器、域名消费者和抓取执行
pub mod workers;

pub use domain::models::{Payload, ProxyConfig, ScraperRequest, ScraperResponse, ScraperType};
pub use engines::reqwest_fetcher::ReqwestFetcher;
pub use engines::traits::{FetchError, Fetcher};
pub use utils::errors::{DispatchError, JobError, SubscriptionError};
pub use workers::Dispatcher;
