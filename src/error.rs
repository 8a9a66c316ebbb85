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

//! 错误处理模块
//!
//! 提供面向 HTTP 的网关错误类型，以及各层错误的统一导出

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

pub use crate::cache::CacheError;
pub use crate::config::ConfigError;
pub use crate::indexer::IndexerError;

/// Result 类型别名
pub type Result<T> = std::result::Result<T, GatewayError>;

/// 网关错误
///
/// 每个变体对应一个固定的 HTTP 状态码，见 [`GatewayError::status_code`]。
#[derive(Debug, Error)]
pub enum GatewayError {
    /// API 密钥不匹配
    #[error("Incorrect API key")]
    InvalidApiKey,

    /// 索引器未配置
    #[error("This indexer ({name}) is not configured.")]
    IndexerUnconfigured { id: String, name: String },

    /// 未知索引器
    #[error("Indexer '{0}' was not found.")]
    IndexerNotFound(String),

    /// 无法解析的查询参数
    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    /// 索引器拒绝该查询类型
    #[error("Indexer '{indexer}' does not support query type '{query_type}'.")]
    UnsupportedQuery { indexer: String, query_type: String },

    /// 索引器查询失败
    #[error("Indexer '{indexer}' query failed: {source}")]
    IndexerQuery {
        indexer: String,
        #[source]
        source: IndexerError,
    },

    /// 索引器查询超时
    #[error("Indexer '{indexer}' did not answer within {timeout_secs}s.")]
    IndexerTimeout { indexer: String, timeout_secs: u64 },

    /// 代理下载链接无法解码
    #[error("Invalid download link: {0}")]
    InvalidProxyLink(String),

    /// 代理下载失败
    #[error("Download from indexer '{indexer}' failed: {source}")]
    Download {
        indexer: String,
        #[source]
        source: IndexerError,
    },

    /// 资源不存在（例如图标）
    #[error("{0} not found")]
    NotFound(String),

    /// XML 渲染失败
    #[error("Failed to render torznab xml: {0}")]
    Xml(String),

    /// 缓存读取失败（写入失败不会以此形式出现）
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl GatewayError {
    /// 错误对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidApiKey | GatewayError::IndexerUnconfigured { .. } => {
                StatusCode::FORBIDDEN
            }
            GatewayError::IndexerNotFound(_) | GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::MalformedQuery(_)
            | GatewayError::UnsupportedQuery { .. }
            | GatewayError::InvalidProxyLink(_) => StatusCode::BAD_REQUEST,
            GatewayError::IndexerQuery { .. }
            | GatewayError::IndexerTimeout { .. }
            | GatewayError::Download { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::Xml(_) | GatewayError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("torznab gateway error: {self}");
        }
        (status, self.to_string()).into_response()
    }
}
