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

//! 能力文档
//!
//! `t=caps` 返回的 XML，描述索引器支持的查询类型与分类

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use serde::{Deserialize, Serialize};

use super::categories::TorznabCategory;
use super::query::QueryType;
use super::xml_error as xml_err;
use crate::error::GatewayError;

/// 索引器能力
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorznabCapabilities {
    /// 是否支持通用搜索
    pub search_available: bool,
    /// 是否支持剧集搜索
    pub tv_search_available: bool,
    /// 是否支持电影搜索
    pub movie_search_available: bool,
    /// 电影搜索是否支持 imdbid
    pub supports_imdb_search: bool,
    /// 单次返回上限
    pub limits_max: usize,
    /// 默认返回条数
    pub limits_default: usize,
    /// 分类树
    pub categories: Vec<TorznabCategory>,
}

impl Default for TorznabCapabilities {
    fn default() -> Self {
        Self {
            search_available: true,
            tv_search_available: false,
            movie_search_available: false,
            supports_imdb_search: false,
            limits_max: 100,
            limits_default: 100,
            categories: Vec::new(),
        }
    }
}

impl TorznabCapabilities {
    /// 由分类编号构造，其余字段取默认值
    pub fn with_categories(ids: &[u32]) -> Self {
        Self {
            categories: TorznabCategory::tree_from_ids(ids),
            ..Default::default()
        }
    }

    /// 查询类型是否被支持
    pub fn supports(&self, query_type: &QueryType) -> bool {
        match query_type {
            QueryType::Search => self.search_available,
            QueryType::TvSearch => self.tv_search_available,
            QueryType::MovieSearch => self.movie_search_available,
            QueryType::Caps => true,
            QueryType::Other(_) => false,
        }
    }

    /// 所有分类编号（含子分类）
    pub fn category_ids(&self) -> Vec<u32> {
        self.categories
            .iter()
            .flat_map(|c| std::iter::once(c.id).chain(c.sub_categories.iter().map(|s| s.id)))
            .collect()
    }

    /// 渲染为 caps XML
    pub fn to_xml(&self) -> Result<String, GatewayError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_err)?;
        writer
            .write_event(Event::Start(BytesStart::new("caps")))
            .map_err(xml_err)?;

        writer
            .write_event(Event::Empty(
                BytesStart::new("server").with_attributes([("title", "Torznab Gateway")]),
            ))
            .map_err(xml_err)?;

        let max = self.limits_max.to_string();
        let default = self.limits_default.to_string();
        writer
            .write_event(Event::Empty(
                BytesStart::new("limits")
                    .with_attributes([("max", max.as_str()), ("default", default.as_str())]),
            ))
            .map_err(xml_err)?;

        writer
            .write_event(Event::Start(BytesStart::new("searching")))
            .map_err(xml_err)?;
        let movie_params = if self.supports_imdb_search { "q,imdbid" } else { "q" };
        for (name, available, params) in [
            ("search", self.search_available, "q"),
            ("tv-search", self.tv_search_available, "q,season,ep"),
            ("movie-search", self.movie_search_available, movie_params),
        ] {
            writer
                .write_event(Event::Empty(BytesStart::new(name).with_attributes([
                    ("available", if available { "yes" } else { "no" }),
                    ("supportedParams", params),
                ])))
                .map_err(xml_err)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("searching")))
            .map_err(xml_err)?;

        writer
            .write_event(Event::Start(BytesStart::new("categories")))
            .map_err(xml_err)?;
        for category in &self.categories {
            let id = category.id.to_string();
            let element = BytesStart::new("category")
                .with_attributes([("id", id.as_str()), ("name", category.name.as_str())]);

            if category.sub_categories.is_empty() {
                writer.write_event(Event::Empty(element)).map_err(xml_err)?;
                continue;
            }

            writer.write_event(Event::Start(element)).map_err(xml_err)?;
            for sub in &category.sub_categories {
                let sub_id = sub.id.to_string();
                writer
                    .write_event(Event::Empty(
                        BytesStart::new("subcat")
                            .with_attributes([("id", sub_id.as_str()), ("name", sub.name.as_str())]),
                    ))
                    .map_err(xml_err)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new("category")))
                .map_err(xml_err)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("categories")))
            .map_err(xml_err)?;

        writer
            .write_event(Event::End(BytesEnd::new("caps")))
            .map_err(xml_err)?;

        String::from_utf8(writer.into_inner()).map_err(xml_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports() {
        let caps = TorznabCapabilities {
            tv_search_available: true,
            ..Default::default()
        };
        assert!(caps.supports(&QueryType::Search));
        assert!(caps.supports(&QueryType::TvSearch));
        assert!(!caps.supports(&QueryType::MovieSearch));
        assert!(!caps.supports(&QueryType::Other("music".to_string())));
    }

    #[test]
    fn test_caps_xml_shape() {
        let caps = TorznabCapabilities {
            tv_search_available: true,
            ..TorznabCapabilities::with_categories(&[5000, 5040])
        };
        let xml = caps.to_xml().unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<caps>"));
        assert!(xml.contains(r#"<limits max="100" default="100"/>"#));
        assert!(xml.contains(r#"<search available="yes" supportedParams="q"/>"#));
        assert!(xml.contains(r#"<tv-search available="yes" supportedParams="q,season,ep"/>"#));
        assert!(xml.contains(r#"<movie-search available="no" supportedParams="q"/>"#));
        assert!(xml.contains(r#"<category id="5000" name="TV">"#));
        assert!(xml.contains(r#"<subcat id="5040" name="TV/HD"/>"#));
        assert!(xml.trim_end().ends_with("</caps>"));
    }

    #[test]
    fn test_category_ids() {
        let caps = TorznabCapabilities::with_categories(&[2040, 5030]);
        assert_eq!(caps.category_ids(), vec![2000, 2040, 5000, 5030]);
    }
}
