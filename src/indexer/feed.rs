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

//! 通用 RSS 索引器
//!
//! 读取上游 RSS/Torznab 源，解析为发布条目

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::time::Duration;
use url::Url;

use super::{Indexer, IndexerError};
use crate::config::FeedIndexerConfig;
use crate::torznab::{QueryType, ReleaseInfo, TorznabCapabilities, TorznabQuery};

pub struct FeedIndexer {
    config: FeedIndexerConfig,
    capabilities: TorznabCapabilities,
    client: reqwest::Client,
}

impl FeedIndexer {
    /// 使用独立的 HTTP 客户端创建
    pub fn new(config: FeedIndexerConfig) -> Result<Self, IndexerError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("torznab-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(config, client))
    }

    /// 使用共享的 HTTP 客户端创建
    ///
    /// 超时按请求设置，共享客户端本身不带超时。
    pub fn with_client(config: FeedIndexerConfig, client: reqwest::Client) -> Self {
        let capabilities = TorznabCapabilities {
            tv_search_available: config.tv_search,
            movie_search_available: config.movie_search,
            supports_imdb_search: config.movie_search && config.imdb_search,
            ..TorznabCapabilities::with_categories(&config.categories)
        };

        Self {
            config,
            capabilities,
            client,
        }
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs.max(1))
    }

    /// 构造上游请求地址
    fn build_url(&self, query: &TorznabQuery) -> Result<Url, IndexerError> {
        let feed_url = self
            .config
            .feed_url
            .as_deref()
            .ok_or_else(|| IndexerError::NotConfigured(self.config.id.clone()))?;
        let mut url = Url::parse(feed_url)?;

        let term = query.full_search_string();
        if !query.is_feed() && !term.is_empty() {
            url.query_pairs_mut()
                .append_pair(&self.config.search_param, &term);
        }
        if self.capabilities.supports_imdb_search {
            if let Some(number) = query.imdb_number() {
                url.query_pairs_mut()
                    .append_pair("imdbid", &format!("tt{:07}", number));
            }
        }

        Ok(url)
    }

    /// 下载地址只允许指向上游源或站点所在主机
    fn is_allowed_download(&self, link: &Url) -> bool {
        let allowed_hosts: Vec<String> = [self.config.feed_url.as_deref(), Some(self.config.site_link.as_str())]
            .into_iter()
            .flatten()
            .filter_map(|u| Url::parse(u).ok())
            .filter_map(|u| u.host_str().map(str::to_lowercase))
            .collect();

        matches!(link.scheme(), "http" | "https")
            && link
                .host_str()
                .map(|host| allowed_hosts.iter().any(|h| h == &host.to_lowercase()))
                .unwrap_or(false)
    }
}

#[async_trait]
impl Indexer for FeedIndexer {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn display_name(&self) -> &str {
        &self.config.name
    }

    fn display_description(&self) -> &str {
        &self.config.description
    }

    fn site_link(&self) -> &str {
        &self.config.site_link
    }

    fn is_configured(&self) -> bool {
        self.config
            .feed_url
            .as_deref()
            .map(|u| !u.trim().is_empty())
            .unwrap_or(false)
    }

    fn capabilities(&self) -> &TorznabCapabilities {
        &self.capabilities
    }

    async fn perform_query(&self, query: &TorznabQuery) -> Result<Vec<ReleaseInfo>, IndexerError> {
        if matches!(query.query_type, QueryType::Caps) || !self.capabilities.supports(&query.query_type) {
            return Err(IndexerError::Unsupported(query.query_type.to_string()));
        }

        let url = self.build_url(query)?;
        tracing::debug!("Fetching {} from {}", self.config.id, url);

        let body = self
            .client
            .get(url)
            .timeout(self.request_timeout())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_feed(&body)
    }

    async fn download(&self, link: &Url) -> Result<Vec<u8>, IndexerError> {
        if !self.is_allowed_download(link) {
            return Err(IndexerError::LinkRejected(link.to_string()));
        }

        let bytes = self
            .client
            .get(link.clone())
            .timeout(self.request_timeout())
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}

/// 解析 RSS 文档中的 `<item>`
pub fn parse_feed(xml: &str) -> Result<Vec<ReleaseInfo>, IndexerError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut releases = Vec::new();
    let mut current: Option<ReleaseInfo> = None;
    let mut element: Vec<u8> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                if name == b"item" {
                    current = Some(ReleaseInfo::default());
                } else if let Some(release) = current.as_mut() {
                    apply_attributes(release, &e);
                }
                element = name;
            }
            Ok(Event::Empty(e)) => {
                if let Some(release) = current.as_mut() {
                    apply_attributes(release, &e);
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(release) = current.as_mut() {
                    let text = t.unescape().map_err(|e| IndexerError::Parse(e.to_string()))?;
                    apply_text(release, &element, text.as_ref());
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(release) = current.as_mut() {
                    let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    apply_text(release, &element, &text);
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"item" {
                    if let Some(release) = current.take() {
                        if !release.title.is_empty() {
                            releases.push(release);
                        }
                    }
                }
                element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(IndexerError::Parse(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(releases)
}

fn apply_text(release: &mut ReleaseInfo, element: &[u8], text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }

    match element {
        b"title" => release.title = text.to_string(),
        b"guid" => release.guid = Some(text.to_string()),
        b"link" => release.link = Some(text.to_string()),
        b"comments" => release.comments = Some(text.to_string()),
        b"description" => release.description = Some(text.to_string()),
        b"pubDate" => {
            release.publish_date = DateTime::parse_from_rfc2822(text)
                .map(|d| d.with_timezone(&Utc))
                .unwrap_or_default();
        }
        b"size" => release.size = text.parse().ok().or(release.size),
        b"category" => {
            if let Ok(id) = text.parse::<u32>() {
                push_category(release, id);
            }
        }
        _ => {}
    }
}

fn apply_attributes(release: &mut ReleaseInfo, e: &BytesStart<'_>) {
    let mut name = None;
    let mut value = None;
    let mut url = None;
    let mut length = None;

    for attr in e.attributes().flatten() {
        let Ok(attr_value) = attr.unescape_value() else {
            continue;
        };
        match attr.key.local_name().as_ref() {
            b"name" => name = Some(attr_value.into_owned()),
            b"value" => value = Some(attr_value.into_owned()),
            b"url" => url = Some(attr_value.into_owned()),
            b"length" => length = attr_value.parse::<u64>().ok(),
            _ => {}
        }
    }

    match e.local_name().as_ref() {
        b"enclosure" => {
            if release.link.is_none() {
                release.link = url;
            }
            if release.size.is_none() {
                release.size = length;
            }
        }
        b"attr" => {
            if let (Some(name), Some(value)) = (name, value) {
                apply_torznab_attr(release, &name, &value);
            }
        }
        _ => {}
    }
}

fn apply_torznab_attr(release: &mut ReleaseInfo, name: &str, value: &str) {
    match name {
        "seeders" => release.seeders = value.parse().ok(),
        "peers" => release.peers = value.parse().ok(),
        "size" => release.size = value.parse().ok().or(release.size),
        "files" => release.files = value.parse().ok(),
        "grabs" => release.grabs = value.parse().ok(),
        "infohash" => release.info_hash = Some(value.to_string()),
        "magneturl" => release.magnet_uri = Some(value.to_string()),
        "imdb" | "imdbid" => release.imdb = value.trim_start_matches("tt").parse().ok(),
        "minimumratio" => release.minimum_ratio = value.parse().ok(),
        "minimumseedtime" => release.minimum_seed_time = value.parse().ok(),
        "downloadvolumefactor" => release.download_volume_factor = value.parse().ok(),
        "uploadvolumefactor" => release.upload_volume_factor = value.parse().ok(),
        "category" => {
            if let Ok(id) = value.parse::<u32>() {
                push_category(release, id);
            }
        }
        _ => {}
    }
}

fn push_category(release: &mut ReleaseInfo, id: u32) {
    if !release.categories.contains(&id) {
        release.categories.push(id);
    }
}
