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

//! Torznab 网关核心库
//!
//! 在多个索引器后端之前提供统一的 Torznab（RSS/XML）查询接口：
//!
//! - [`torznab`] 协议类型：查询、能力文档、发布条目、RSS 结果页
//! - [`indexer`] 索引器后端抽象与注册表
//! - [`cache`] 非搜索（RSS 模式）结果缓存
//! - [`search`] 请求处理管线
//! - [`api`] HTTP 接口

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod indexer;
pub mod search;
pub mod torznab;

pub use config::GatewayConfig;
pub use error::{GatewayError, Result};
