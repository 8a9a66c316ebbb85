// Copyright 2025 nostalgiatan
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

//! 结果缓存模块
//!
//! 保存各索引器最近一次 RSS 模式（无搜索词）查询的完整结果。
//! 每个索引器一条记录，新写入覆盖旧记录。

pub mod memory;
pub mod sled_store;

pub use memory::MemoryCacheService;
pub use sled_store::SledCacheService;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{CacheBackend, CacheConfig};
use crate::torznab::ReleaseInfo;

/// 缓存错误
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 某个索引器的缓存记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResult {
    pub indexer_id: String,
    pub items: Vec<ReleaseInfo>,
    pub inserted_at: DateTime<Utc>,
}

impl CachedResult {
    /// 新记录，条目数超过 `max_items` 时截断
    pub fn new(indexer_id: &str, mut items: Vec<ReleaseInfo>, max_items: usize) -> Self {
        items.truncate(max_items);
        Self {
            indexer_id: indexer_id.to_string(),
            items,
            inserted_at: Utc::now(),
        }
    }
}

/// 跨索引器列出的单个缓存条目
#[derive(Debug, Clone, Serialize)]
pub struct CachedRelease {
    pub indexer_id: String,
    pub inserted_at: DateTime<Utc>,
    pub release: ReleaseInfo,
}

/// 缓存服务
#[async_trait]
pub trait CacheService: Send + Sync {
    /// 写入索引器的完整结果集，替换旧记录
    async fn put(&self, indexer_id: &str, items: Vec<ReleaseInfo>) -> Result<(), CacheError>;

    /// 读取索引器的缓存记录
    async fn get(&self, indexer_id: &str) -> Result<Option<CachedResult>, CacheError>;

    /// 所有记录
    async fn entries(&self) -> Result<Vec<CachedResult>, CacheError>;

    /// 最近写入的条目，按写入时间倒序
    async fn recent(&self, limit: usize) -> Result<Vec<CachedRelease>, CacheError> {
        Ok(flatten_recent(self.entries().await?, limit))
    }
}

/// 展开记录并按写入时间倒序取前 `limit` 条
///
/// 同一记录内保持原有顺序。
pub fn flatten_recent(mut entries: Vec<CachedResult>, limit: usize) -> Vec<CachedRelease> {
    entries.sort_by(|a, b| b.inserted_at.cmp(&a.inserted_at));
    entries
        .into_iter()
        .flat_map(|entry| {
            let indexer_id = entry.indexer_id;
            let inserted_at = entry.inserted_at;
            entry.items.into_iter().map(move |release| CachedRelease {
                indexer_id: indexer_id.clone(),
                inserted_at,
                release,
            })
        })
        .take(limit)
        .collect()
}

/// 按配置创建缓存服务
pub fn build_cache(config: &CacheConfig) -> Result<Arc<dyn CacheService>, CacheError> {
    match config.backend {
        CacheBackend::Memory => {
            tracing::info!("Using in-memory result cache");
            Ok(Arc::new(MemoryCacheService::new(config.max_results_per_indexer)))
        }
        CacheBackend::Sled => {
            tracing::info!("Using sled result cache at {}", config.path.display());
            Ok(Arc::new(SledCacheService::open(
                &config.path,
                config.max_results_per_indexer,
            )?))
        }
    }
}
