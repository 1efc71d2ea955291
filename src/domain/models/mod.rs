// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了调度器的核心数据结构，包括：
/// - 抓取请求（scraper_request）：调用方提交的抓取任务及其回调
/// - 抓取响应（scraper_response）：交给回调的结果快照
/// - 域名任务（domain_job）：附带域名键的队列元素
pub mod domain_job;
pub mod scraper_request;
pub mod scraper_response;

pub use domain_job::DomainJob;
pub use scraper_request::{ProxyConfig, ResponseCallback, ScraperRequest, ScraperType};
pub use scraper_response::{Payload, ScraperResponse};
