// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 队列模块
///
/// 提供按域名分区的任务队列集合和执行中任务注册表
pub mod queue_set;
pub mod running_registry;

pub use queue_set::{DomainQueue, QueueSet};
pub use running_registry::RunningRegistry;
