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

//! 发布条目
//!
//! 后端返回的单个结果，以及把下载链接改写为网关代理链接的逻辑

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// 代理链接末尾的文件名
pub const PROXY_FILE_NAME: &str = "download.torrent";

/// 发布条目
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReleaseInfo {
    /// 标题
    pub title: String,
    /// 唯一标识
    pub guid: Option<String>,
    /// 下载链接
    pub link: Option<String>,
    /// 详情页链接
    pub comments: Option<String>,
    /// 发布时间
    pub publish_date: DateTime<Utc>,
    /// 分类编号
    pub categories: Vec<u32>,
    /// 大小（字节）
    pub size: Option<u64>,
    pub files: Option<u32>,
    pub grabs: Option<u32>,
    pub description: Option<String>,
    /// IMDb 数字编号（不含 `tt` 前缀）
    pub imdb: Option<u64>,
    pub seeders: Option<u32>,
    pub peers: Option<u32>,
    pub info_hash: Option<String>,
    pub magnet_uri: Option<String>,
    pub minimum_ratio: Option<f64>,
    pub minimum_seed_time: Option<u64>,
    pub download_volume_factor: Option<f64>,
    pub upload_volume_factor: Option<f64>,
}

impl ReleaseInfo {
    /// 把下载链接改写为经由网关的代理链接
    ///
    /// 原链接以 base64url 编码嵌入路径，不会出现在输出中。`guid` 为空时依次取
    /// 详情页链接、代理链接。没有下载链接（仅磁力链接）的条目保持不变。
    pub fn into_proxy_link(mut self, server_url: &str, indexer_id: &str) -> Self {
        let Some(original) = self.link.take() else {
            return self;
        };

        let proxied = proxy_link(server_url, indexer_id, &original);
        if self.guid.is_none() {
            self.guid = Some(self.comments.clone().unwrap_or_else(|| proxied.clone()));
        }
        self.link = Some(proxied);
        self
    }
}

/// 构造代理链接 `{server}api/{indexer}/download/{encoded}/download.torrent`
pub fn proxy_link(server_url: &str, indexer_id: &str, original: &str) -> String {
    format!(
        "{}api/{}/download/{}/{}",
        server_url,
        indexer_id,
        URL_SAFE_NO_PAD.encode(original.as_bytes()),
        PROXY_FILE_NAME
    )
}

/// 解码代理链接中的原始下载地址
pub fn decode_proxy_link(encoded: &str) -> Result<url::Url, GatewayError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded.trim_end_matches('='))
        .map_err(|e| GatewayError::InvalidProxyLink(e.to_string()))?;
    let link = String::from_utf8(bytes).map_err(|e| GatewayError::InvalidProxyLink(e.to_string()))?;
    url::Url::parse(&link).map_err(|e| GatewayError::InvalidProxyLink(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_proxy_link() {
        let release = ReleaseInfo {
            title: "Some.Show.S01E01".to_string(),
            link: Some("https://tracker.example/dl/1?passkey=x".to_string()),
            ..Default::default()
        };

        let proxied = release.into_proxy_link("http://localhost:9117/", "example");
        let link = proxied.link.unwrap();

        assert!(link.starts_with("http://localhost:9117/api/example/download/"));
        assert!(link.ends_with("/download.torrent"));
        assert_eq!(proxied.guid.as_deref(), Some(link.as_str()));
        assert!(!proxied.guid.as_deref().unwrap_or_default().contains("passkey"));

        let encoded = link
            .trim_start_matches("http://localhost:9117/api/example/download/")
            .trim_end_matches("/download.torrent");
        let decoded = decode_proxy_link(encoded).unwrap();
        assert_eq!(decoded.as_str(), "https://tracker.example/dl/1?passkey=x");
    }

    #[test]
    fn test_existing_guid_is_kept() {
        let release = ReleaseInfo {
            guid: Some("guid-1".to_string()),
            link: Some("https://tracker.example/dl/1".to_string()),
            ..Default::default()
        };
        let proxied = release.into_proxy_link("http://gw:80/", "x");
        assert_eq!(proxied.guid.as_deref(), Some("guid-1"));
    }

    #[test]
    fn test_guid_falls_back_to_comments() {
        let release = ReleaseInfo {
            link: Some("https://tracker.example/dl/7?passkey=secret".to_string()),
            comments: Some("https://tracker.example/details/7".to_string()),
            ..Default::default()
        };
        let proxied = release.into_proxy_link("http://gw:80/", "x");
        assert_eq!(proxied.guid.as_deref(), Some("https://tracker.example/details/7"));
    }

    #[test]
    fn test_magnet_only_release_is_untouched() {
        let release = ReleaseInfo {
            magnet_uri: Some("magnet:?xt=urn:btih:abc".to_string()),
            ..Default::default()
        };
        let proxied = release.clone().into_proxy_link("http://gw:80/", "x");
        assert_eq!(proxied, release);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_proxy_link("%%%"),
            Err(GatewayError::InvalidProxyLink(_))
        ));
        // "not a url" 的编码
        let encoded = URL_SAFE_NO_PAD.encode("not a url");
        assert!(decode_proxy_link(&encoded).is_err());
    }
}
