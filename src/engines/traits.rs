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

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

use crate::domain::models::{Payload, ProxyConfig, ScraperType};

/// 抓取错误类型
#[derive(Error, Debug)]
pub enum FetchError {
    /// 请求失败
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// 服务器返回错误状态码
    #[error("HTTP status {0}")]
    Status(u16),
    /// 超时
    #[error("Timeout")]
    Timeout,
    /// 不支持的协议
    #[error("Unsupported scheme: {0}")]
    UnsupportedScheme(String),
    /// 网络层错误（连接被拒绝、连接重置等）
    #[error("Network error: {0}")]
    Network(String),
    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

impl FetchError {
    /// 判断错误是否为可重试的网络层错误
    ///
    /// # 返回值
    ///
    /// 如果错误是可重试的则返回true，否则返回false
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Request(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.status().is_some_and(is_transient_status)
            }
            FetchError::Status(code) => reqwest::StatusCode::from_u16(*code)
                .map(is_transient_status)
                .unwrap_or(false),
            FetchError::Timeout | FetchError::Network(_) => true,
            FetchError::UnsupportedScheme(_) | FetchError::Other(_) => false,
        }
    }
}

fn is_transient_status(status: reqwest::StatusCode) -> bool {
    status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS
}

/// 抓取能力
///
/// 调度器通过此特质执行一次网络请求，不解析返回内容：
/// `Text` 返回文本，`Binary` 返回原始字节。
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// 执行一次抓取
    async fn fetch(
        &self,
        uri: &Url,
        proxy: Option<&ProxyConfig>,
        kind: ScraperType,
    ) -> Result<Payload, FetchError>;

    /// 抓取器名称
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<T: Fetcher + ?Sized> Fetcher for Arc<T> {
    async fn fetch(
        &self,
        uri: &Url,
        proxy: Option<&ProxyConfig>,
        kind: ScraperType,
    ) -> Result<Payload, FetchError> {
        (**self).fetch(uri, proxy, kind).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
