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

//! API 外部接口模块
//!
//! 组装路由、中间件并启动 HTTP 服务

use axum::{Router, middleware, routing::get};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    handle_cache_recent, handle_download, handle_health, handle_indexers_list, handle_logo,
    handle_metrics, handle_realtime_metrics, handle_torznab,
};
use super::metrics::{MetricsCollector, MetricsConfig};
use super::middleware::{RateLimiterState, create_cors_layer, rate_limit_middleware};
use crate::cache::CacheService;
use crate::config::GatewayConfig;
use crate::indexer::IndexerManager;
use crate::search::{PipelineSettings, TorznabInterface};

/// API 服务状态
#[derive(Clone)]
pub struct ApiState {
    /// Torznab 接口
    pub torznab: Arc<TorznabInterface>,
    /// 版本信息
    pub version: String,
    /// 指标收集器
    pub metrics: Arc<MetricsCollector>,
    /// 配置的对外地址
    pub base_url: Option<String>,
    /// 图标目录
    pub logos_dir: PathBuf,
}

/// API 接口
pub struct ApiInterface {
    state: ApiState,
    rate_limiter: Arc<RateLimiterState>,
    cors_origins: Vec<String>,
    bind_addr: String,
}

impl ApiInterface {
    /// 从配置创建 API 接口
    ///
    /// 注册表与缓存由调用方创建，进程内只存在一份。
    pub fn from_config(
        config: &GatewayConfig,
        indexers: Arc<IndexerManager>,
        cache: Arc<dyn CacheService>,
    ) -> Self {
        let torznab = Arc::new(TorznabInterface::new(
            PipelineSettings::from_config(&config.server),
            indexers,
            cache,
        ));
        let metrics = Arc::new(MetricsCollector::new(MetricsConfig::default()));

        let state = ApiState {
            torznab,
            version: env!("CARGO_PKG_VERSION").to_string(),
            metrics: metrics.clone(),
            base_url: config.server.normalized_base_url(),
            logos_dir: config.server.logos_dir.clone(),
        };

        Self {
            state,
            rate_limiter: Arc::new(RateLimiterState::new(config.rate_limit.clone(), metrics)),
            cors_origins: config.server.cors_origins.clone(),
            bind_addr: format!("{}:{}", config.server.host, config.server.port),
        }
    }

    pub fn state(&self) -> &ApiState {
        &self.state
    }

    /// 构建路由器
    pub fn build_router(&self) -> Router {
        Router::new()
            // Torznab 路由
            .route("/api/{indexer}", get(handle_torznab))
            .route("/torznab/api/{indexer}", get(handle_torznab))
            .route(
                "/api/v2.0/indexers/{indexer}/results/torznab",
                get(handle_torznab),
            )
            .route(
                "/api/v2.0/indexers/{indexer}/results/torznab/api",
                get(handle_torznab),
            )
            // 代理下载
            .route("/api/{indexer}/download/{link}/{file}", get(handle_download))
            // 管理接口
            .route("/api/indexers", get(handle_indexers_list))
            .route("/api/cache/recent", get(handle_cache_recent))
            // 静态资源
            .route("/logos/{file}", get(handle_logo))
            // 健康检查与指标
            .route("/health", get(handle_health))
            .route("/metrics", get(handle_metrics))
            .route("/metrics/realtime", get(handle_realtime_metrics))
            .with_state(self.state.clone())
            .layer(middleware::from_fn_with_state(
                self.rate_limiter.clone(),
                rate_limit_middleware,
            ))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(create_cors_layer(&self.cors_origins)),
            )
    }

    /// 启动服务器，Ctrl-C 时优雅退出
    pub async fn serve(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let app = self.build_router();
        let listener = tokio::net::TcpListener::bind(&self.bind_addr).await?;

        tracing::info!("Torznab gateway listening on {}", listener.local_addr()?);
        tracing::info!(
            "Serving {} indexers",
            self.state.torznab.indexers().len()
        );

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        tracing::info!("Torznab gateway stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
