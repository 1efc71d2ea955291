// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use dashmap::DashMap;
use std::collections::HashMap;
use uuid::Uuid;

/// 运行注册表
///
/// 执行ID到域名键的映射，是“全局和每个域名有多少请求在执行中”
/// 的唯一数据来源。只有准入步骤插入，只有执行器的终止步骤移除。
#[derive(Debug, Default)]
pub struct RunningRegistry {
    entries: DashMap<Uuid, String>,
}

impl RunningRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入执行记录
    ///
    /// # 返回值
    ///
    /// ID已存在时返回false，不覆盖原记录
    pub fn try_insert(&self, execution_id: Uuid, domain: &str) -> bool {
        match self.entries.entry(execution_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(domain.to_string());
                true
            }
        }
    }

    /// 移除执行记录，返回其域名
    pub fn remove(&self, execution_id: &Uuid) -> Option<String> {
        self.entries.remove(execution_id).map(|(_, domain)| domain)
    }

    pub fn contains(&self, execution_id: &Uuid) -> bool {
        self.entries.contains_key(execution_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 指定域名的执行中数量
    pub fn count_for(&self, domain: &str) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value() == domain)
            .count()
    }

    /// 按域名统计执行中数量
    pub fn counts_by_domain(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for entry in self.entries.iter() {
            *counts.entry(entry.value().clone()).or_insert(0) += 1;
        }
        counts
    }
}
