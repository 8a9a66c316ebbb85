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

//! Torznab 网关命令行入口

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use torznab_gateway::GatewayConfig;
use torznab_gateway::api::ApiInterface;
use torznab_gateway::cache::build_cache;
use torznab_gateway::indexer::{FeedIndexer, Indexer, IndexerManager};

/// Torznab 网关
#[derive(Debug, Parser)]
#[command(name = "torznab-gateway", version, about = "Torznab gateway for indexer feeds")]
struct Cli {
    /// TOML 配置文件
    #[arg(short, long, env = "TORZNAB_GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// 覆盖监听地址
    #[arg(long)]
    host: Option<String>,

    /// 覆盖监听端口
    #[arg(short, long)]
    port: Option<u16>,

    /// 覆盖 API 密钥
    #[arg(long, env = "TORZNAB_GATEWAY_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// 日志级别（`RUST_LOG` 优先）
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from {}", path.display());
            GatewayConfig::load(path)?
        }
        None => {
            let mut config = GatewayConfig::default();
            config.apply_env_overrides();
            config
        }
    };

    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(api_key) = cli.api_key.filter(|k| !k.trim().is_empty()) {
        config.server.api_key = api_key.trim().to_string();
    }

    if config.ensure_api_key() {
        tracing::warn!("No API key configured, generated one: {}", config.server.api_key);
    }
    if config.server.insecure_skip_api_key {
        tracing::warn!("insecure_skip_api_key is enabled: API keys are NOT checked");
    }
    config.validate()?;

    let indexers = Arc::new(IndexerManager::new());
    let client = reqwest::Client::builder()
        .user_agent(concat!("torznab-gateway/", env!("CARGO_PKG_VERSION")))
        .build()?;
    for indexer_config in &config.indexers {
        let indexer = FeedIndexer::with_client(indexer_config.clone(), client.clone());
        if !indexer.is_configured() {
            tracing::warn!("Indexer {} has no feed_url and will reject searches", indexer.id());
        }
        indexers.register(Arc::new(indexer));
    }

    let cache = build_cache(&config.cache)?;
    let api = ApiInterface::from_config(&config, indexers, cache);
    api.serve().await
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
