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

//! Torznab 查询解析
//!
//! 把 URL 查询串规范化为不可变的 [`TorznabQuery`]

use std::fmt;

use crate::error::GatewayError;

/// 查询类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryType {
    /// 通用搜索（`t=search`）
    Search,
    /// 剧集搜索（`t=tvsearch`）
    TvSearch,
    /// 电影搜索（`t=movie`）
    MovieSearch,
    /// 能力查询（`t=caps`）
    Caps,
    /// 未识别的类型，原样交给后端判断
    Other(String),
}

impl QueryType {
    /// 大小写不敏感地解析查询类型
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "search" => QueryType::Search,
            "tvsearch" | "tv-search" => QueryType::TvSearch,
            "movie" | "movie-search" | "moviesearch" => QueryType::MovieSearch,
            "caps" => QueryType::Caps,
            _ => QueryType::Other(raw.to_string()),
        }
    }

    /// 协议中的规范名称
    pub fn as_str(&self) -> &str {
        match self {
            QueryType::Search => "search",
            QueryType::TvSearch => "tvsearch",
            QueryType::MovieSearch => "movie",
            QueryType::Caps => "caps",
            QueryType::Other(raw) => raw,
        }
    }

    pub fn is_caps(&self) -> bool {
        matches!(self, QueryType::Caps)
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 规范化后的 Torznab 查询
///
/// 每个请求解析一次，之后只读。
#[derive(Debug, Clone, PartialEq)]
pub struct TorznabQuery {
    /// 查询类型（`t`）
    pub query_type: QueryType,
    /// 调用方提供的 API 密钥（`apikey`）
    pub api_key: String,
    /// 原始搜索词（`q`），仅用于日志
    pub search_term: String,
    /// 季（`season`）
    pub season: Option<u32>,
    /// 集（`ep`），保持原样
    pub episode: Option<String>,
    /// 分类（`cat`），去重且保持顺序
    pub categories: Vec<u32>,
    /// 最大返回条数（`limit`）
    pub limit: Option<usize>,
    /// 偏移量（`offset`）
    pub offset: Option<usize>,
    /// IMDb 编号（`imdbid`）
    pub imdb_id: Option<String>,
}

impl Default for TorznabQuery {
    fn default() -> Self {
        Self {
            query_type: QueryType::Search,
            api_key: String::new(),
            search_term: String::new(),
            season: None,
            episode: None,
            categories: Vec::new(),
            limit: None,
            offset: None,
            imdb_id: None,
        }
    }
}

impl TorznabQuery {
    /// 从原始查询串解析（不含前导 `?`）
    pub fn from_query_string(raw: &str) -> Result<Self, GatewayError> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw)
            .map_err(|e| GatewayError::MalformedQuery(e.to_string()))?;
        Self::from_pairs(pairs)
    }

    /// 从键值对解析
    ///
    /// 可选字段缺失时取空值；重复的键以最后一次出现为准。
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, GatewayError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut query = TorznabQuery::default();
        let mut query_type: Option<String> = None;

        for (key, value) in pairs {
            let value = value.as_ref();
            match key.as_ref() {
                "t" => query_type = Some(value.to_string()),
                "apikey" => query.api_key = value.trim().to_string(),
                "q" => query.search_term = value.to_string(),
                "season" => query.season = parse_optional_number("season", value)?,
                "ep" => {
                    let ep = value.trim();
                    query.episode = (!ep.is_empty()).then(|| ep.to_string());
                }
                "cat" => query.categories = parse_categories(value)?,
                "limit" => query.limit = parse_optional_number("limit", value)?,
                "offset" => query.offset = parse_optional_number("offset", value)?,
                "imdbid" => {
                    let id = value.trim();
                    query.imdb_id = (!id.is_empty()).then(|| id.to_string());
                }
                _ => {}
            }
        }

        if let Some(raw) = query_type {
            query.query_type = QueryType::parse(&raw);
        }

        Ok(query)
    }

    /// 去除不安全字符后的搜索词
    pub fn sanitized_search_term(&self) -> String {
        self.search_term
            .chars()
            .filter(|c| {
                c.is_alphanumeric()
                    || c.is_whitespace()
                    || matches!(c, '-' | '.' | '_' | '(' | ')' | '@' | '/' | '\'' | '[' | ']' | '+' | '%')
            })
            .collect::<String>()
            .trim()
            .to_string()
    }

    /// 是否为 RSS 模式（无搜索词、无 IMDb 编号）的查询
    pub fn is_feed(&self) -> bool {
        self.imdb_id.is_none() && self.sanitized_search_term().is_empty()
    }

    /// IMDb 数字编号，`tt0133093` 与 `133093` 都解析为 133093
    pub fn imdb_number(&self) -> Option<u64> {
        let id = self.imdb_id.as_deref()?;
        id.strip_prefix("tt").unwrap_or(id).parse().ok()
    }

    /// 季/集检索串，例如 `S01`、`S01E02`
    pub fn episode_search_string(&self) -> String {
        let Some(season) = self.season.filter(|s| *s > 0) else {
            return String::new();
        };

        match self.episode.as_deref() {
            None => format!("S{:02}", season),
            Some(ep) => match ep.parse::<u32>() {
                Ok(number) => format!("S{:02}E{:02}", season, number),
                Err(_) => format!("S{:02}E{}", season, ep),
            },
        }
    }

    /// 搜索词与季集串合并后的完整检索串
    pub fn full_search_string(&self) -> String {
        format!("{} {}", self.sanitized_search_term(), self.episode_search_string())
            .trim()
            .to_string()
    }
}

fn parse_optional_number<T: std::str::FromStr>(
    name: &str,
    value: &str,
) -> Result<Option<T>, GatewayError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<T>()
        .map(Some)
        .map_err(|_| GatewayError::MalformedQuery(format!("'{}' is not a valid {}", value, name)))
}

fn parse_categories(value: &str) -> Result<Vec<u32>, GatewayError> {
    let mut categories = Vec::new();
    for part in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let id = part.parse::<u32>().map_err(|_| {
            GatewayError::MalformedQuery(format!("'{}' is not a valid category", part))
        })?;
        if !categories.contains(&id) {
            categories.push(id);
        }
    }
    Ok(categories)
}
