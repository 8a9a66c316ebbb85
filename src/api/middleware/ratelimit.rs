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

//! 限流中间件
//!
//! 全局限流加按 IP 限流，超限返回 429

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultDirectRateLimiter, DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::api::metrics::MetricsCollector;
use crate::config::RateLimitSettings;

/// 每处理这么多次按 IP 检查，清理一次闲置的 IP 状态
const EVICT_EVERY: u64 = 1024;

/// 限流器状态
pub struct RateLimiterState {
    /// 全局限流器
    global_limiter: DefaultDirectRateLimiter,
    /// 按 IP 限流
    ///
    /// 每个IP的配额为全局的10%，至少 1 请求/秒、突发 2。
    ip_limiter: DefaultKeyedRateLimiter<IpAddr>,
    checks: AtomicU64,
    config: RateLimitSettings,
    metrics: Arc<MetricsCollector>,
}

impl RateLimiterState {
    pub fn new(config: RateLimitSettings, metrics: Arc<MetricsCollector>) -> Self {
        let per_ip_rate = std::cmp::max(1, config.requests_per_second / 10);
        let per_ip_burst = std::cmp::max(2, config.burst_size / 10);

        Self {
            global_limiter: RateLimiter::direct(quota(config.requests_per_second, config.burst_size)),
            ip_limiter: RateLimiter::keyed(quota(per_ip_rate, per_ip_burst)),
            checks: AtomicU64::new(0),
            config,
            metrics,
        }
    }

    /// 请求是否放行
    pub fn check(&self, ip: Option<IpAddr>) -> bool {
        if !self.config.enabled {
            return true;
        }
        if self.global_limiter.check().is_err() {
            return false;
        }
        let Some(ip) = ip else {
            return true;
        };

        if self.checks.fetch_add(1, Ordering::Relaxed) % EVICT_EVERY == EVICT_EVERY - 1 {
            self.evict_idle();
        }
        self.ip_limiter.check_key(&ip).is_ok()
    }

    /// 丢弃配额已回满的 IP 状态
    fn evict_idle(&self) {
        self.ip_limiter.retain_recent();
        self.ip_limiter.shrink_to_fit();
        tracing::debug!("Rate limiter tracks {} client addresses", self.ip_limiter.len());
    }
}

fn quota(per_second: u32, burst: u32) -> Quota {
    let per_second = NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(burst).unwrap_or(per_second);
    Quota::per_second(per_second).allow_burst(burst)
}

/// 限流中间件
pub async fn rate_limit_middleware(
    State(state): State<Arc<RateLimiterState>>,
    req: Request,
    next: Next,
) -> Response {
    let ip = extract_client_ip(&req);
    if state.check(ip) {
        return next.run(req).await;
    }

    tracing::debug!("Rate limited request from {:?}", ip);
    state.metrics.record_rate_limited();
    create_rate_limit_response()
}

fn create_rate_limit_response() -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        "Too many requests, please retry later",
    )
        .into_response();

    response
        .headers_mut()
        .insert("Retry-After", HeaderValue::from_static("60"));

    response
}

/// 提取客户端IP
///
/// 依次检查 `X-Forwarded-For`、`X-Real-IP` 和连接地址。
fn extract_client_ip(req: &Request) -> Option<IpAddr> {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok());
    if forwarded.is_some() {
        return forwarded;
    }

    let real_ip = req
        .headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|ip| ip.trim().parse().ok());
    if real_ip.is_some() {
        return real_ip;
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}
