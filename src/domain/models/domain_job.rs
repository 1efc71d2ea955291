// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::Url;

use crate::domain::models::scraper_request::ScraperRequest;
use crate::domain::models::scraper_response::ScraperResponse;

/// 域名队列中的任务
///
/// 在原始请求基础上附带解析后的URL和域名键。
/// 同一域名队列中的所有任务都具有该域名的键。
#[derive(Debug, Clone)]
pub struct DomainJob {
    /// 原始请求
    pub request: ScraperRequest,
    /// 域名键（小写 host[:port]）
    pub domain: String,
    /// 解析后的绝对URL
    pub uri: Url,
}

impl DomainJob {
    pub fn new(request: ScraperRequest, domain: String, uri: Url) -> Self {
        Self {
            request,
            domain,
            uri,
        }
    }

    /// 生成一份不含结果的响应快照
    pub fn snapshot(&self) -> ScraperResponse {
        ScraperResponse {
            url: self.request.url.clone(),
            proxy: self.request.proxy.clone(),
            optional_arguments: self.request.optional_arguments.clone(),
            scraper_type: self.request.scraper_type,
            payload: None,
            error: None,
        }
    }
}
