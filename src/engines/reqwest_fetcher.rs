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
use dashmap::DashMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::settings::FetcherSettings;
use crate::domain::models::{Payload, ProxyConfig, ScraperType};
use crate::engines::traits::{FetchError, Fetcher};

/// 基于reqwest的抓取器
///
/// 无代理请求共享一个客户端，每个代理配置各自缓存一个客户端。
pub struct ReqwestFetcher {
    settings: FetcherSettings,
    default_client: reqwest::Client,
    proxy_clients: DashMap<String, reqwest::Client>,
}

impl ReqwestFetcher {
    /// 创建新的抓取器
    ///
    /// # 参数
    ///
    /// * `settings` - 抓取器配置
    ///
    /// # 返回值
    ///
    /// * `Ok(ReqwestFetcher)` - 创建成功
    /// * `Err(FetchError)` - 客户端构建失败
    pub fn new(settings: FetcherSettings) -> Result<Self, FetchError> {
        let default_client = build_client(&settings, None)?;
        Ok(Self {
            settings,
            default_client,
            proxy_clients: DashMap::new(),
        })
    }

    fn client_for(&self, proxy: Option<&ProxyConfig>) -> Result<reqwest::Client, FetchError> {
        let Some(proxy) = proxy else {
            return Ok(self.default_client.clone());
        };

        let key = proxy.cache_key();
        if let Some(client) = self.proxy_clients.get(&key) {
            return Ok(client.clone());
        }

        let client = build_client(&self.settings, Some(proxy))?;
        self.proxy_clients.insert(key, client.clone());
        Ok(client)
    }
}

fn build_client(
    settings: &FetcherSettings,
    proxy: Option<&ProxyConfig>,
) -> Result<reqwest::Client, FetchError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(Duration::from_secs(settings.timeout_secs));

    if let Some(proxy) = proxy {
        let mut reqwest_proxy = reqwest::Proxy::all(proxy.url.as_str())
            .map_err(|e| FetchError::Other(format!("Invalid proxy: {}", e)))?;
        if let Some(username) = &proxy.username {
            reqwest_proxy =
                reqwest_proxy.basic_auth(username, proxy.password.as_deref().unwrap_or(""));
        }
        builder = builder.proxy(reqwest_proxy);
    }

    if settings.accept_invalid_certs {
        builder = builder.danger_accept_invalid_certs(true);
    }

    Ok(builder.build()?)
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    /// 执行HTTP GET
    ///
    /// 非2xx状态码返回 `FetchError::Status`，由调用方决定是否重试
    async fn fetch(
        &self,
        uri: &Url,
        proxy: Option<&ProxyConfig>,
        kind: ScraperType,
    ) -> Result<Payload, FetchError> {
        if !matches!(uri.scheme(), "http" | "https") {
            return Err(FetchError::UnsupportedScheme(uri.scheme().to_string()));
        }

        let client = self.client_for(proxy)?;
        let response = client.get(uri.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let payload = match kind {
            ScraperType::Text => Payload::Text(response.text().await?),
            ScraperType::Binary => Payload::Binary(response.bytes().await?),
        };
        debug!(url = %uri, size = payload.len(), "Fetched payload");

        Ok(payload)
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}

#[cfg(test)]
#[path = "reqwest_fetcher_test.rs"]
mod tests;
