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

//! Torznab 处理器
//!
//! 处理 `/api/{indexer}` 及其别名路由

use axum::{
    extract::{ConnectInfo, Path, RawQuery, State},
    http::{Extensions, HeaderMap, header},
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::time::Instant;

use crate::api::on::ApiState;
use crate::search::RequestContext;
use crate::torznab::RSS_CONTENT_TYPE;

/// 处理 Torznab 请求
pub async fn handle_torznab(
    State(state): State<ApiState>,
    Path(indexer): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    extensions: Extensions,
) -> Response {
    let start = Instant::now();
    let ctx = request_context(&state, &headers, &extensions);

    let result = state
        .torznab
        .handle(&indexer, query.as_deref().unwrap_or(""), &ctx)
        .await;

    state.metrics.record_request(result.is_ok(), start.elapsed());

    match result {
        Ok(response) => (
            [(header::CONTENT_TYPE, RSS_CONTENT_TYPE)],
            response.into_body(),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// 构造请求上下文
///
/// 配置了 `base_url` 时优先使用，否则从请求头推导。
pub(crate) fn request_context(
    state: &ApiState,
    headers: &HeaderMap,
    extensions: &Extensions,
) -> RequestContext {
    let server_url = state
        .base_url
        .clone()
        .unwrap_or_else(|| server_url_from_headers(headers));
    let remote_addr = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    RequestContext::new(server_url, remote_addr)
}

/// 从 `X-Forwarded-Proto` 与 `Host` 推导 `{scheme}://{host}:{port}/`
pub fn server_url_from_headers(headers: &HeaderMap) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_lowercase())
        .filter(|v| v == "http" || v == "https")
        .unwrap_or_else(|| "http".to_string());

    let default_port = if scheme == "https" { 443 } else { 80 };
    let host_header = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("localhost");

    let (host, port) = split_host_port(host_header, default_port);
    format!("{}://{}:{}/", scheme, host, port)
}

/// 拆分 `Host` 头中的主机与端口，支持 `[::1]:8080` 形式
pub fn split_host_port(value: &str, default_port: u16) -> (&str, u16) {
    if value.starts_with('[') {
        if let Some(end) = value.find(']') {
            let host = &value[..=end];
            let port = value[end + 1..]
                .strip_prefix(':')
                .and_then(|p| p.parse().ok())
                .unwrap_or(default_port);
            return (host, port);
        }
        return (value, default_port);
    }

    match value.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host, port),
            Err(_) => (value, default_port),
        },
        None => (value, default_port),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_split_host_port() {
        assert_eq!(split_host_port("example.org:8080", 80), ("example.org", 8080));
        assert_eq!(split_host_port("example.org", 443), ("example.org", 443));
        assert_eq!(split_host_port("[::1]:9117", 80), ("[::1]", 9117));
        assert_eq!(split_host_port("[::1]", 80), ("[::1]", 80));
    }

    #[test]
    fn test_server_url_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("gw.example.org:9117"));
        assert_eq!(server_url_from_headers(&headers), "http://gw.example.org:9117/");

        headers.insert(header::HOST, HeaderValue::from_static("gw.example.org"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(server_url_from_headers(&headers), "https://gw.example.org:443/");

        assert_eq!(server_url_from_headers(&HeaderMap::new()), "http://localhost:80/");
    }
}
