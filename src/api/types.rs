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

//! API 类型定义模块
//!
//! JSON 接口使用的请求参数与响应结构

use serde::{Deserialize, Serialize};

use crate::cache::CachedRelease;
use crate::indexer::Indexer;
use crate::search::PipelineStatsResult;

/// 管理接口的查询参数
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiKeyParams {
    #[serde(default)]
    pub apikey: String,

    /// 返回条目上限
    pub limit: Option<usize>,
}

/// 索引器信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiIndexerInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub site_link: String,
    pub configured: bool,
    pub tv_search: bool,
    pub movie_search: bool,
    pub categories: Vec<u32>,
}

impl ApiIndexerInfo {
    pub fn from_indexer(indexer: &dyn Indexer) -> Self {
        let caps = indexer.capabilities();
        Self {
            id: indexer.id().to_string(),
            name: indexer.display_name().to_string(),
            description: indexer.display_description().to_string(),
            site_link: indexer.site_link().to_string(),
            configured: indexer.is_configured(),
            tv_search: caps.tv_search_available,
            movie_search: caps.movie_search_available,
            categories: caps.category_ids(),
        }
    }
}

/// 缓存列表响应
#[derive(Debug, Clone, Serialize)]
pub struct ApiCacheResponse {
    pub total: usize,
    pub releases: Vec<CachedRelease>,
}

/// 健康检查响应
#[derive(Debug, Clone, Serialize)]
pub struct ApiHealthResponse {
    pub status: String,
    pub version: String,
    pub indexers: usize,
    pub configured_indexers: usize,
    pub stats: PipelineStatsResult,
}
