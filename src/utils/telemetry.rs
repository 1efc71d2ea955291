// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::TelemetrySettings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 初始化日志订阅器
///
/// `RUST_LOG` 优先，其次是配置中的过滤器，最后回退到 `info,fetchrs=debug`。
pub fn init_telemetry(settings: &TelemetrySettings) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        settings
            .filter
            .clone()
            .unwrap_or_else(|| "info,fetchrs=debug".to_string())
            .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    let result = if settings.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if let Err(e) = result {
        tracing::warn!("Tracing subscriber already installed: {}", e);
    }
}
