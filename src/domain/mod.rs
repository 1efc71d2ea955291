// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型
///
/// 抓取请求、响应和域名任务
pub mod models;

/// 领域服务
///
/// 请求校验与域名键计算
pub mod services;
