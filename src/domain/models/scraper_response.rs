// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use bytes::Bytes;
use std::collections::HashMap;

use crate::domain::models::scraper_request::{ProxyConfig, ScraperType};
use crate::utils::errors::JobError;

/// 抓取负载
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// 文本内容
    Text(String),
    /// 原始字节
    Binary(Bytes),
}

impl Payload {
    pub fn len(&self) -> usize {
        match self {
            Payload::Text(text) => text.len(),
            Payload::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 负载对应的抓取类型
    pub fn scraper_type(&self) -> ScraperType {
        match self {
            Payload::Text(_) => ScraperType::Text,
            Payload::Binary(_) => ScraperType::Binary,
        }
    }
}

/// 抓取响应
///
/// 每次回调都会基于请求生成一份新的快照。终止回调中 `payload` 与 `error`
/// 恰好有一个被填充；`on_dequeue` 收到的快照两者都为空。
#[derive(Debug, Clone, PartialEq)]
pub struct ScraperResponse {
    /// 请求URL（原始字符串）
    pub url: String,
    /// 代理配置
    pub proxy: Option<ProxyConfig>,
    /// 调用方自定义参数
    pub optional_arguments: Option<HashMap<String, String>>,
    /// 抓取类型
    pub scraper_type: ScraperType,
    /// 抓取结果
    pub payload: Option<Payload>,
    /// 错误信息
    pub error: Option<JobError>,
}

impl ScraperResponse {
    /// 文本结果
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            Some(Payload::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    /// 二进制结果
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.payload {
            Some(Payload::Binary(bytes)) => Some(bytes.as_ref()),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.payload.is_some() && self.error.is_none()
    }

    pub(crate) fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self.error = None;
        self
    }

    pub(crate) fn with_error(mut self, error: JobError) -> Self {
        self.payload = None;
        self.error = Some(error);
        self
    }
}
