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

//! Torznab 协议模块
//!
//! 包含查询解析、能力文档、发布条目、结果过滤和 RSS 结果页渲染

pub mod caps;
pub mod categories;
pub mod feed;
pub mod filter;
pub mod query;
pub mod release;

pub use caps::TorznabCapabilities;
pub use categories::TorznabCategory;
pub use feed::{ChannelInfo, ResultPage};
pub use filter::{filter_results, paginate};
pub use query::{QueryType, TorznabQuery};
pub use release::ReleaseInfo;

/// RSS 响应的媒体类型
pub const RSS_CONTENT_TYPE: &str = "application/rss+xml";

/// Torznab 扩展命名空间
pub const TORZNAB_NAMESPACE: &str = "http://torznab.com/schemas/2015/feed";

/// Atom 命名空间
pub const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";

/// 把 XML 写入错误转换为网关错误
pub(crate) fn xml_error<E: std::fmt::Display>(e: E) -> crate::error::GatewayError {
    crate::error::GatewayError::Xml(e.to_string())
}
