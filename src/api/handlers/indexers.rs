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

//! 索引器与缓存列表处理器
//!
//! 两个接口都需要 API 密钥

use axum::{
    Json,
    extract::{Query, State},
    http::{Extensions, HeaderMap},
};

use super::torznab::request_context;
use crate::api::on::ApiState;
use crate::api::types::{ApiCacheResponse, ApiIndexerInfo, ApiKeyParams};
use crate::error::Result;

/// 缓存列表默认条目数
const DEFAULT_RECENT_LIMIT: usize = 100;

/// 处理 `/api/indexers`
pub async fn handle_indexers_list(
    State(state): State<ApiState>,
    Query(params): Query<ApiKeyParams>,
    headers: HeaderMap,
    extensions: Extensions,
) -> Result<Json<Vec<ApiIndexerInfo>>> {
    let ctx = request_context(&state, &headers, &extensions);
    state.torznab.authorize(&params.apikey, &ctx)?;

    let indexers = state
        .torznab
        .indexers()
        .list()
        .iter()
        .map(|indexer| ApiIndexerInfo::from_indexer(indexer.as_ref()))
        .collect();

    Ok(Json(indexers))
}

/// 处理 `/api/cache/recent`
pub async fn handle_cache_recent(
    State(state): State<ApiState>,
    Query(params): Query<ApiKeyParams>,
    headers: HeaderMap,
    extensions: Extensions,
) -> Result<Json<ApiCacheResponse>> {
    let ctx = request_context(&state, &headers, &extensions);
    state.torznab.authorize(&params.apikey, &ctx)?;

    let limit = params.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    let releases = state.torznab.cache().recent(limit).await?;

    Ok(Json(ApiCacheResponse {
        total: releases.len(),
        releases,
    }))
}
