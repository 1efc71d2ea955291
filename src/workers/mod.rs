// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 提供调度器、域名消费者和抓取执行器
/// 包括准入控制、重试、回调交付和静止通知
pub(crate) mod context;
pub(crate) mod domain_consumer;
pub(crate) mod fetch_executor;
pub mod manager;
pub mod quiescence;


pub use manager::Dispatcher;
pub use quiescence::{EndProcessCallback, SubscriptionId};
