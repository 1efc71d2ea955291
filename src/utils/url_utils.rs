// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::{ParseError, Url};

/// 将可能为相对路径的URL转换为绝对路径URL
pub fn resolve_url(base_url: &Url, path: &str) -> Result<Url, ParseError> {
    base_url.join(path)
}

/// 提取URL的授权部分（小写的 host[:port]）
///
/// 默认端口不会出现在结果中；没有主机的URL返回 `None`。
pub fn authority_key(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    if host.is_empty() {
        return None;
    }

    let host = host.to_lowercase();
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}
