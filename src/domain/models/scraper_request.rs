// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::domain::models::scraper_response::ScraperResponse;

/// 响应回调
///
/// 由调用方随请求一起提供，调度器在相应事件发生时调用
pub type ResponseCallback = Arc<dyn Fn(ScraperResponse) + Send + Sync>;

/// 抓取类型
///
/// 决定抓取结果以文本还是二进制形式交给调用方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScraperType {
    /// 文本内容（HTML等）
    #[default]
    Text,
    /// 原始字节（文件下载）
    Binary,
}

impl fmt::Display for ScraperType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScraperType::Text => write!(f, "text"),
            ScraperType::Binary => write!(f, "binary"),
        }
    }
}

impl FromStr for ScraperType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" | "string" => Ok(ScraperType::Text),
            "binary" => Ok(ScraperType::Binary),
            _ => Err(()),
        }
    }
}

/// 代理配置
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// 代理地址
    pub url: String,
    /// 用户名
    pub username: Option<String>,
    /// 密码
    pub password: Option<String>,
}

impl ProxyConfig {
    /// 创建不带认证信息的代理
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }

    /// 创建带基本认证的代理
    pub fn with_basic_auth(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// 缓存客户端时使用的键
    pub fn cache_key(&self) -> String {
        match &self.username {
            Some(user) => format!("{}@{}", user, self.url),
            None => self.url.clone(),
        }
    }
}

/// 抓取请求
///
/// 由调用方创建并拥有，调度器只读取。`url` 和 `on_data_arrived` 为必填项，
/// 在入队时校验。
#[derive(Clone, Default)]
pub struct ScraperRequest {
    /// 目标URL
    pub url: String,
    /// 代理配置
    pub proxy: Option<ProxyConfig>,
    /// 调用方自定义参数，原样带回响应
    pub optional_arguments: Option<HashMap<String, String>>,
    /// 抓取类型
    pub scraper_type: ScraperType,
    /// 任务被准入执行时触发
    pub on_dequeue: Option<ResponseCallback>,
    /// 成功获取数据时触发（必填）
    pub on_data_arrived: Option<ResponseCallback>,
    /// 最终失败时触发
    pub on_thrown_exception: Option<ResponseCallback>,
}

impl ScraperRequest {
    /// 创建新的抓取请求
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_optional_arguments(mut self, arguments: HashMap<String, String>) -> Self {
        self.optional_arguments = Some(arguments);
        self
    }

    pub fn with_scraper_type(mut self, scraper_type: ScraperType) -> Self {
        self.scraper_type = scraper_type;
        self
    }

    pub fn on_dequeue<F>(mut self, callback: F) -> Self
    where
        F: Fn(ScraperResponse) + Send + Sync + 'static,
    {
        self.on_dequeue = Some(Arc::new(callback));
        self
    }

    pub fn on_data_arrived<F>(mut self, callback: F) -> Self
    where
        F: Fn(ScraperResponse) + Send + Sync + 'static,
    {
        self.on_data_arrived = Some(Arc::new(callback));
        self
    }

    pub fn on_thrown_exception<F>(mut self, callback: F) -> Self
    where
        F: Fn(ScraperResponse) + Send + Sync + 'static,
    {
        self.on_thrown_exception = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for ScraperRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScraperRequest")
            .field("url", &self.url)
            .field("proxy", &self.proxy)
            .field("optional_arguments", &self.optional_arguments)
            .field("scraper_type", &self.scraper_type)
            .field("on_dequeue", &self.on_dequeue.is_some())
            .field("on_data_arrived", &self.on_data_arrived.is_some())
            .field("on_thrown_exception", &self.on_thrown_exception.is_some())
            .finish()
    }
}
