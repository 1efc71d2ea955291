// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

use crate::config::settings::MetricsSettings;

/// 安装 Prometheus 指标导出器
///
/// 未启用时什么都不做。监听地址被占用或已安装过记录器时只记录警告，
/// 调度器的计数器在没有记录器时是空操作。
///
/// # 参数
///
/// * `settings` - 指标配置
///
/// # 返回值
///
/// * `Ok(Some(addr))` - 导出器已在 `addr` 上监听
/// * `Ok(None)` - 未启用或安装失败
/// * `Err` - 监听地址无效
pub fn init_metrics(settings: &MetricsSettings) -> anyhow::Result<Option<SocketAddr>> {
    if !settings.enabled {
        return Ok(None);
    }

    let addr: SocketAddr = settings.listen_addr.parse()?;

    // Port already in use or recorder already installed
    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!(
            "Failed to install Prometheus recorder: {}. This might happen if the port is already in use.",
            e
        );
        return Ok(None);
    }

    info!("Metrics exporter listening on {}", addr);
    Ok(Some(addr))
}
