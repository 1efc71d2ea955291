// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use tracing::debug;
use url::{ParseError, Url};

use crate::domain::models::{DomainJob, ScraperRequest};
use crate::utils::errors::DispatchError;
use crate::utils::url_utils;

/// 域名路由器
///
/// 校验请求并计算分区键（小写的 host[:port]）。
/// 配置了基础URL时，相对URL会先解析为绝对URL。
#[derive(Debug, Clone, Default)]
pub struct DomainRouter {
    base_url: Option<Url>,
}

impl DomainRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用基础URL创建路由器
    ///
    /// # 参数
    ///
    /// * `base_url` - 解析相对URL时使用的绝对URL
    ///
    /// # 返回值
    ///
    /// * `Ok(DomainRouter)` - 创建成功
    /// * `Err(DispatchError::InvalidRequest)` - 基础URL无效或没有主机
    pub fn with_base_url(base_url: &str) -> Result<Self, DispatchError> {
        let base = Url::parse(base_url).map_err(|e| {
            DispatchError::InvalidRequest(format!("Base URL '{}' is invalid: {}", base_url, e))
        })?;
        if url_utils::authority_key(&base).is_none() {
            return Err(DispatchError::InvalidRequest(format!(
                "Base URL '{}' has no host",
                base_url
            )));
        }
        Ok(Self {
            base_url: Some(base),
        })
    }

    /// 校验请求并生成域名任务
    ///
    /// # 返回值
    ///
    /// * `Ok(DomainJob)` - 带有域名键和解析后URL的任务
    /// * `Err(DispatchError::InvalidRequest)` - URL为空、无效，或缺少 `on_data_arrived`
    pub fn resolve(&self, request: ScraperRequest) -> Result<DomainJob, DispatchError> {
        if request.url.trim().is_empty() {
            return Err(DispatchError::InvalidRequest("URL is required.".to_string()));
        }

        if request.on_data_arrived.is_none() {
            return Err(DispatchError::InvalidRequest(
                "OnDataArrived is required.".to_string(),
            ));
        }

        let uri = self.parse(&request.url)?;
        let domain = Self::domain_key(&uri)?;
        debug!(url = %request.url, domain = %domain, "Resolved domain key");

        Ok(DomainJob::new(request, domain, uri))
    }

    /// 解析URL，必要时相对基础URL解析
    pub fn parse(&self, raw: &str) -> Result<Url, DispatchError> {
        let raw = raw.trim();
        match Url::parse(raw) {
            Ok(url) => Ok(url),
            Err(ParseError::RelativeUrlWithoutBase) => match &self.base_url {
                Some(base) => url_utils::resolve_url(base, raw).map_err(|e| invalid_url(raw, e)),
                None => Err(DispatchError::InvalidRequest(format!(
                    "URL '{}' is relative and no base URL is configured",
                    raw
                ))),
            },
            Err(e) => Err(invalid_url(raw, e)),
        }
    }

    /// 计算URL的域名键
    pub fn domain_key(url: &Url) -> Result<String, DispatchError> {
        url_utils::authority_key(url).ok_or_else(|| {
            DispatchError::InvalidRequest(format!("URL '{}' has no authority", url))
        })
    }
}

fn invalid_url(raw: &str, error: ParseError) -> DispatchError {
    DispatchError::InvalidRequest(format!("URL '{}' is invalid: {}", raw, error))
}
