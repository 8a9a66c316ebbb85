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

//! RSS 结果页
//!
//! 频道元数据加发布条目，渲染为带 torznab 扩展属性的 RSS 文档

use chrono::{DateTime, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use super::release::ReleaseInfo;
use super::xml_error as xml_err;
use super::{ATOM_NAMESPACE, RSS_CONTENT_TYPE, TORZNAB_NAMESPACE};
use crate::error::GatewayError;
use crate::indexer::Indexer;

/// 频道元数据
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelInfo {
    pub title: String,
    pub description: String,
    pub link: String,
    pub image_url: String,
    pub image_title: String,
    pub image_link: String,
    pub image_description: String,
}

impl ChannelInfo {
    /// 由索引器描述字段与服务器地址构造
    ///
    /// 图标地址为 `{server}logos/{id}.png`。
    pub fn for_indexer(indexer: &dyn Indexer, server_url: &str) -> Self {
        Self {
            title: indexer.display_name().to_string(),
            description: indexer.display_description().to_string(),
            link: indexer.site_link().to_string(),
            image_url: format!("{}logos/{}.png", server_url, indexer.id()),
            image_title: indexer.display_name().to_string(),
            image_link: indexer.site_link().to_string(),
            image_description: indexer.display_name().to_string(),
        }
    }
}

/// 结果页
#[derive(Debug, Clone)]
pub struct ResultPage {
    pub channel: ChannelInfo,
    pub releases: Vec<ReleaseInfo>,
}

impl ResultPage {
    pub fn new(channel: ChannelInfo, releases: Vec<ReleaseInfo>) -> Self {
        Self { channel, releases }
    }

    /// 渲染为 RSS 文档
    ///
    /// `self_link` 写入 `<atom:link rel="self">`。
    pub fn to_xml(&self, self_link: &str) -> Result<String, GatewayError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_err)?;
        writer
            .write_event(Event::Start(BytesStart::new("rss").with_attributes([
                ("version", "1.0"),
                ("xmlns:atom", ATOM_NAMESPACE),
                ("xmlns:torznab", TORZNAB_NAMESPACE),
            ])))
            .map_err(xml_err)?;
        writer
            .write_event(Event::Start(BytesStart::new("channel")))
            .map_err(xml_err)?;

        writer
            .write_event(Event::Empty(BytesStart::new("atom:link").with_attributes([
                ("href", self_link),
                ("rel", "self"),
                ("type", RSS_CONTENT_TYPE),
            ])))
            .map_err(xml_err)?;

        let channel = &self.channel;
        write_text_element(&mut writer, "title", &channel.title)?;
        write_text_element(&mut writer, "description", &channel.description)?;
        write_text_element(&mut writer, "link", &channel.link)?;
        write_text_element(&mut writer, "language", "en-us")?;
        write_text_element(&mut writer, "category", "search")?;

        writer
            .write_event(Event::Start(BytesStart::new("image")))
            .map_err(xml_err)?;
        write_text_element(&mut writer, "url", &channel.image_url)?;
        write_text_element(&mut writer, "title", &channel.image_title)?;
        write_text_element(&mut writer, "link", &channel.image_link)?;
        write_text_element(&mut writer, "description", &channel.image_description)?;
        writer
            .write_event(Event::End(BytesEnd::new("image")))
            .map_err(xml_err)?;

        for release in &self.releases {
            write_item(&mut writer, release)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("channel")))
            .map_err(xml_err)?;
        writer
            .write_event(Event::End(BytesEnd::new("rss")))
            .map_err(xml_err)?;

        String::from_utf8(writer.into_inner()).map_err(xml_err)
    }
}

fn write_item(writer: &mut Writer<Vec<u8>>, release: &ReleaseInfo) -> Result<(), GatewayError> {
    writer
        .write_event(Event::Start(BytesStart::new("item")))
        .map_err(xml_err)?;

    let link = release.link.as_deref().or(release.magnet_uri.as_deref());

    write_text_element(writer, "title", &release.title)?;
    if let Some(guid) = release.guid.as_deref().or(link) {
        write_text_element(writer, "guid", guid)?;
    }
    if let Some(comments) = &release.comments {
        write_text_element(writer, "comments", comments)?;
    }
    if release.publish_date != DateTime::<Utc>::default() {
        write_text_element(writer, "pubDate", &format_pub_date(&release.publish_date))?;
    }
    if let Some(size) = release.size {
        write_text_element(writer, "size", &size.to_string())?;
    }
    if let Some(files) = release.files {
        write_text_element(writer, "files", &files.to_string())?;
    }
    if let Some(grabs) = release.grabs {
        write_text_element(writer, "grabs", &grabs.to_string())?;
    }
    write_text_element(writer, "description", release.description.as_deref().unwrap_or(""))?;
    if let Some(link) = link {
        write_text_element(writer, "link", link)?;
    }
    for category in &release.categories {
        write_text_element(writer, "category", &category.to_string())?;
    }

    if let Some(link) = link {
        let length = release.size.map(|s| s.to_string());
        let mut enclosure = BytesStart::new("enclosure");
        enclosure.push_attribute(("url", link));
        if let Some(length) = length.as_deref() {
            enclosure.push_attribute(("length", length));
        }
        enclosure.push_attribute(("type", "application/x-bittorrent"));
        writer.write_event(Event::Empty(enclosure)).map_err(xml_err)?;
    }

    for category in &release.categories {
        write_torznab_attr(writer, "category", &category.to_string())?;
    }
    if let Some(imdb) = release.imdb {
        write_torznab_attr(writer, "imdb", &format!("{:07}", imdb))?;
    }
    let numeric_attrs = [
        ("seeders", release.seeders.map(|v| v.to_string())),
        ("peers", release.peers.map(|v| v.to_string())),
        ("minimumratio", release.minimum_ratio.map(|v| v.to_string())),
        ("minimumseedtime", release.minimum_seed_time.map(|v| v.to_string())),
        ("downloadvolumefactor", release.download_volume_factor.map(|v| v.to_string())),
        ("uploadvolumefactor", release.upload_volume_factor.map(|v| v.to_string())),
    ];
    for (name, value) in numeric_attrs {
        if let Some(value) = value {
            write_torznab_attr(writer, name, &value)?;
        }
    }
    if let Some(info_hash) = &release.info_hash {
        write_torznab_attr(writer, "infohash", info_hash)?;
    }
    if let Some(magnet) = &release.magnet_uri {
        write_torznab_attr(writer, "magneturl", magnet)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("item")))
        .map_err(xml_err)?;
    Ok(())
}

fn write_text_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    text: &str,
) -> Result<(), GatewayError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(xml_err)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_err)?;
    Ok(())
}

fn write_torznab_attr(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    value: &str,
) -> Result<(), GatewayError> {
    writer
        .write_event(Event::Empty(
            BytesStart::new("torznab:attr").with_attributes([("name", name), ("value", value)]),
        ))
        .map_err(xml_err)?;
    Ok(())
}

/// RFC 822 日期，时区写成 `+0000`
fn format_pub_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S %z").to_string()
}
