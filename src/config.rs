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

//! 配置模块
//!
//! 从 TOML 文件加载网关配置，所有段都有默认值

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// 覆盖 API 密钥的环境变量
pub const API_KEY_ENV: &str = "TORZNAB_GATEWAY_API_KEY";

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// API 密钥（为空时启动时生成）
    pub api_key: String,
    /// 对外地址，例如 `https://gw.example.org/`；为空时从请求头推导
    pub base_url: Option<String>,
    /// 后端查询超时（秒）
    pub dispatch_timeout_secs: u64,
    /// caps 查询是否也需要 API 密钥
    pub caps_require_api_key: bool,
    /// 跳过 API 密钥校验，仅用于开发与测试
    pub insecure_skip_api_key: bool,
    /// 索引器图标目录
    pub logos_dir: PathBuf,
    /// CORS允许的源
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9117,
            api_key: String::new(),
            base_url: None,
            dispatch_timeout_secs: 60,
            caps_require_api_key: false,
            insecure_skip_api_key: false,
            logos_dir: PathBuf::from("logos"),
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl ServerConfig {
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }

    /// 规范化后的对外地址（以 `/` 结尾）
    pub fn normalized_base_url(&self) -> Option<String> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s.ends_with('/') {
                    s.to_string()
                } else {
                    format!("{}/", s)
                }
            })
    }
}

/// 缓存后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// 进程内存
    Memory,
    /// sled 持久化
    Sled,
}

/// 缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// sled 数据目录
    pub path: PathBuf,
    /// 每个索引器最多保留的条目数
    pub max_results_per_indexer: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            path: PathBuf::from("data/cache"),
            max_results_per_indexer: 300,
        }
    }
}

/// 限流配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub requests_per_second: u32,
    pub burst_size: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 50,
            burst_size: 100,
        }
    }
}

/// 通用 RSS/Torznab 上游索引器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedIndexerConfig {
    /// 唯一标识（出现在 URL 中）
    pub id: String,
    /// 显示名称
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// 站点地址
    pub site_link: String,
    /// 上游 RSS 地址；为空表示未配置
    #[serde(default)]
    pub feed_url: Option<String>,
    /// 搜索词参数名
    #[serde(default = "default_search_param")]
    pub search_param: String,
    /// 支持的分类编号
    #[serde(default)]
    pub categories: Vec<u32>,
    #[serde(default)]
    pub tv_search: bool,
    #[serde(default)]
    pub movie_search: bool,
    /// 上游电影搜索是否接受 `imdbid` 参数
    #[serde(default)]
    pub imdb_search: bool,
    /// 上游请求超时（秒）
    #[serde(default = "default_indexer_timeout")]
    pub timeout_secs: u64,
}

fn default_search_param() -> String {
    "q".to_string()
}

fn default_indexer_timeout() -> u64 {
    30
}

/// 网关配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitSettings,
    pub indexers: Vec<FeedIndexerConfig>,
}

impl GatewayConfig {
    /// 从文件加载配置，并应用环境变量覆盖
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// 从 TOML 字符串解析
    ///
    /// API 密钥两端的空白会被去掉。
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.server.api_key = config.server.api_key.trim().to_string();
        Ok(config)
    }

    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.server.api_key = key.trim().to_string();
            }
        }
    }

    /// 确保存在 API 密钥，必要时生成一个
    ///
    /// 返回是否新生成了密钥。
    pub fn ensure_api_key(&mut self) -> bool {
        if !self.server.api_key.trim().is_empty() {
            return false;
        }
        self.server.api_key = uuid::Uuid::new_v4().simple().to_string();
        true
    }

    /// 验证配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must not be 0".to_string()));
        }
        if self.server.dispatch_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "server.dispatch_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.cache.max_results_per_indexer == 0 {
            return Err(ConfigError::Invalid(
                "cache.max_results_per_indexer must be greater than 0".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for indexer in &self.indexers {
            if indexer.id.trim().is_empty() {
                return Err(ConfigError::Invalid("indexer id must not be empty".to_string()));
            }
            if !seen.insert(indexer.id.to_lowercase()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate indexer id '{}'",
                    indexer.id
                )));
            }
        }

        Ok(())
    }
}
