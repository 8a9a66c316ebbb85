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

//! 指标收集模块
//!
//! 请求计数与耗时，导出为 Prometheus 文本格式

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// 全局 recorder 只能安装一次
static PROMETHEUS: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

fn prometheus_handle() -> Option<PrometheusHandle> {
    PROMETHEUS
        .get_or_init(|| {
            let handle = PrometheusBuilder::new().install_recorder().ok();

            describe_counter!("torznab_gateway_requests_total", "Torznab requests by outcome");
            describe_counter!("torznab_gateway_rate_limited", "Number of rate limited requests");
            describe_counter!("torznab_gateway_auth_failures_total", "Requests rejected for a wrong API key");
            describe_counter!("torznab_gateway_dispatch_total", "Queries dispatched to indexers");
            describe_counter!("torznab_gateway_dispatch_failures_total", "Indexer queries that failed");
            describe_counter!("torznab_gateway_dispatch_timeouts_total", "Indexer queries that timed out");
            describe_histogram!("torznab_gateway_response_time_ms", "Response time in milliseconds");

            handle
        })
        .clone()
}

/// 指标配置
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// 是否启用指标收集
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// 实时指标快照
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RealtimeMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// 平均响应时间（毫秒）
    pub avg_response_time_ms: f64,
    /// 限流拒绝数
    pub rate_limited: u64,
    pub uptime_seconds: u64,
}

/// 指标收集器
///
/// 计数写入全局 recorder，同时保留一份进程内计数供 JSON 接口读取。
pub struct MetricsCollector {
    prometheus_handle: Option<PrometheusHandle>,
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    /// 累计响应时间（微秒）
    total_response_time_us: AtomicU64,
    rate_limited: AtomicU64,
    start_time: Instant,
    config: MetricsConfig,
}

impl MetricsCollector {
    pub fn new(config: MetricsConfig) -> Self {
        let prometheus_handle = if config.enabled {
            prometheus_handle()
        } else {
            None
        };

        Self {
            prometheus_handle,
            total_requests: AtomicU64::new(0),
            successful_requests: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
            start_time: Instant::now(),
            config,
        }
    }

    /// 记录一次 Torznab 请求
    pub fn record_request(&self, success: bool, elapsed: Duration) {
        if !self.config.enabled {
            return;
        }

        let outcome = if success { "success" } else { "failed" };
        counter!("torznab_gateway_requests_total", "outcome" => outcome).increment(1);
        histogram!("torznab_gateway_response_time_ms").record(elapsed.as_secs_f64() * 1000.0);

        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        }
        self.total_response_time_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    /// 记录限流
    pub fn record_rate_limited(&self) {
        if !self.config.enabled {
            return;
        }

        counter!("torznab_gateway_rate_limited").increment(1);
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_realtime_metrics(&self) -> RealtimeMetrics {
        let total = self.total_requests.load(Ordering::Relaxed);
        let successful = self.successful_requests.load(Ordering::Relaxed);
        let total_us = self.total_response_time_us.load(Ordering::Relaxed);

        RealtimeMetrics {
            total_requests: total,
            successful_requests: successful,
            failed_requests: total.saturating_sub(successful),
            avg_response_time_ms: if total == 0 {
                0.0
            } else {
                total_us as f64 / total as f64 / 1000.0
            },
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Prometheus 文本
    pub fn get_prometheus_metrics(&self) -> Option<String> {
        self.prometheus_handle.as_ref().map(|h| h.render())
    }
}
