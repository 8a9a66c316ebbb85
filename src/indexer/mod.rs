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

//! 索引器模块
//!
//! 定义索引器后端的统一接口，以及注册表和通用 RSS 后端

pub mod feed;
pub mod manager;

pub use feed::FeedIndexer;
pub use manager::IndexerManager;

use async_trait::async_trait;
use thiserror::Error;

use crate::torznab::{TorznabCapabilities, TorznabQuery, ReleaseInfo, filter_results};

/// 索引器错误
#[derive(Debug, Error)]
pub enum IndexerError {
    /// 后端不支持该操作或查询类型
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// 后端未配置
    #[error("indexer '{0}' is not configured")]
    NotConfigured(String),

    /// HTTP 请求失败
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL 无效
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// 上游响应无法解析
    #[error("failed to parse upstream response: {0}")]
    Parse(String),

    /// 下载链接被拒绝
    #[error("link rejected: {0}")]
    LinkRejected(String),
}

/// 索引器后端
///
/// 注册表持有实例，请求处理管线只在单次请求内借用，不会修改它。
#[async_trait]
pub trait Indexer: Send + Sync {
    /// 唯一标识
    fn id(&self) -> &str;

    /// 显示名称
    fn display_name(&self) -> &str;

    /// 显示描述
    fn display_description(&self) -> &str;

    /// 站点地址
    fn site_link(&self) -> &str;

    /// 是否已配置
    fn is_configured(&self) -> bool;

    /// 能力文档
    fn capabilities(&self) -> &TorznabCapabilities;

    /// 执行查询
    async fn perform_query(&self, query: &TorznabQuery) -> Result<Vec<ReleaseInfo>, IndexerError>;

    /// 过滤后端自身没有处理的条件
    fn filter_results(&self, query: &TorznabQuery, releases: Vec<ReleaseInfo>) -> Vec<ReleaseInfo> {
        filter_results(query, releases)
    }

    /// 下载种子文件
    async fn download(&self, link: &url::Url) -> Result<Vec<u8>, IndexerError> {
        Err(IndexerError::Unsupported(format!(
            "{} does not proxy downloads ({})",
            self.id(),
            link
        )))
    }
}
