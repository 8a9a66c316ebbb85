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

//! Torznab 外部接口模块
//!
//! 处理顺序固定：解析查询 → caps → API 密钥 → 配置检查 → 后端查询
//! → 缓存（仅 RSS 模式）→ 过滤 → 分页 → 组装 RSS。

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::time::timeout;

use crate::cache::CacheService;
use crate::config::ServerConfig;
use crate::error::{GatewayError, Result};
use crate::indexer::{Indexer, IndexerError, IndexerManager};
use crate::torznab::release::decode_proxy_link;
use crate::torznab::{ChannelInfo, ReleaseInfo, ResultPage, TorznabQuery, paginate};

/// 管线设置
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// 网关 API 密钥
    pub api_key: String,
    /// caps 查询是否需要 API 密钥
    pub caps_require_api_key: bool,
    /// 跳过 API 密钥校验
    pub insecure_skip_api_key: bool,
    /// 后端查询超时
    pub dispatch_timeout: Duration,
}

impl PipelineSettings {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            api_key: config.api_key.trim().to_string(),
            caps_require_api_key: config.caps_require_api_key,
            insecure_skip_api_key: config.insecure_skip_api_key,
            dispatch_timeout: config.dispatch_timeout(),
        }
    }
}

/// 单次请求的上下文
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// 对外地址，形如 `http://host:port/`
    pub server_url: String,
    /// 调用方地址
    pub remote_addr: Option<SocketAddr>,
}

impl RequestContext {
    pub fn new(server_url: impl Into<String>, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            server_url: server_url.into(),
            remote_addr,
        }
    }

    fn origin(&self) -> String {
        self.remote_addr
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// 管线输出
#[derive(Debug, Clone, PartialEq)]
pub enum TorznabResponse {
    /// 能力文档
    Caps(String),
    /// 结果 RSS
    Feed(String),
}

impl TorznabResponse {
    pub fn body(&self) -> &str {
        match self {
            TorznabResponse::Caps(xml) | TorznabResponse::Feed(xml) => xml,
        }
    }

    pub fn into_body(self) -> String {
        match self {
            TorznabResponse::Caps(xml) | TorznabResponse::Feed(xml) => xml,
        }
    }
}

/// Torznab 接口
///
/// 注册表与缓存在启动时创建并共享；每个请求只借用，不修改共享状态。
pub struct TorznabInterface {
    settings: PipelineSettings,
    indexers: Arc<IndexerManager>,
    cache: Arc<dyn CacheService>,
    stats: Arc<PipelineStats>,
}

impl TorznabInterface {
    pub fn new(
        settings: PipelineSettings,
        indexers: Arc<IndexerManager>,
        cache: Arc<dyn CacheService>,
    ) -> Self {
        Self {
            settings,
            indexers,
            cache,
            stats: Arc::new(PipelineStats::default()),
        }
    }

    pub fn indexers(&self) -> &Arc<IndexerManager> {
        &self.indexers
    }

    pub fn cache(&self) -> &Arc<dyn CacheService> {
        &self.cache
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// 处理 `/api/{indexer}` 请求
    ///
    /// 索引器先于查询串解析，未知索引器总是 404。
    pub async fn handle(
        &self,
        indexer_id: &str,
        raw_query: &str,
        ctx: &RequestContext,
    ) -> Result<TorznabResponse> {
        let indexer = self.indexers.resolve(indexer_id)?;
        let query = TorznabQuery::from_query_string(raw_query)?;
        self.process(indexer, &query, ctx).await
    }

    /// 对已解析的查询执行完整管线
    pub async fn process(
        &self,
        indexer: Arc<dyn Indexer>,
        query: &TorznabQuery,
        ctx: &RequestContext,
    ) -> Result<TorznabResponse> {
        self.stats.total_requests.fetch_add(1, Ordering::Relaxed);

        if query.query_type.is_caps() && !self.settings.caps_require_api_key {
            return self.caps(indexer.as_ref());
        }

        if let Err(e) = self.check_api_key(query, ctx) {
            self.stats.auth_failures.fetch_add(1, Ordering::Relaxed);
            counter!("torznab_gateway_auth_failures_total").increment(1);
            return Err(e);
        }

        if query.query_type.is_caps() {
            return self.caps(indexer.as_ref());
        }

        if !indexer.is_configured() {
            tracing::warn!(
                "Rejected {} request to unconfigured indexer {}",
                query.query_type,
                indexer.id()
            );
            return Err(GatewayError::IndexerUnconfigured {
                id: indexer.id().to_string(),
                name: indexer.display_name().to_string(),
            });
        }

        let releases = self.dispatch(indexer.as_ref(), query).await?;

        if query.is_feed() {
            self.cache_results(indexer.id(), &releases).await;
        }

        self.log_found(indexer.as_ref(), query, releases.len());

        let filtered = indexer.filter_results(query, releases);
        let page = paginate(query, indexer.capabilities(), filtered);

        let xml = self.assemble(indexer.as_ref(), page, ctx)?;
        Ok(TorznabResponse::Feed(xml))
    }

    /// API 密钥校验
    pub fn check_api_key(&self, query: &TorznabQuery, ctx: &RequestContext) -> Result<()> {
        self.authorize(&query.api_key, ctx)
    }

    /// 比较调用方提供的密钥（大小写不敏感）
    pub fn authorize(&self, api_key: &str, ctx: &RequestContext) -> Result<()> {
        if self.settings.insecure_skip_api_key {
            tracing::warn!(
                "API key check skipped for {} (insecure_skip_api_key is enabled)",
                ctx.origin()
            );
            return Ok(());
        }

        if api_key.trim().eq_ignore_ascii_case(&self.settings.api_key) {
            Ok(())
        } else {
            tracing::warn!("A request from {} was made with an incorrect API key", ctx.origin());
            Err(GatewayError::InvalidApiKey)
        }
    }

    /// 经由网关下载代理链接指向的种子文件
    pub async fn download(&self, indexer_id: &str, encoded_link: &str) -> Result<Vec<u8>> {
        let indexer = self.indexers.resolve(indexer_id)?;
        let link = decode_proxy_link(encoded_link)?;

        match timeout(self.settings.dispatch_timeout, indexer.download(&link)).await {
            Ok(Ok(bytes)) => {
                tracing::debug!("Downloaded {} bytes from {}", bytes.len(), indexer.id());
                Ok(bytes)
            }
            Ok(Err(IndexerError::LinkRejected(link))) => {
                tracing::warn!("{} refused to download {}", indexer.id(), link);
                Err(GatewayError::InvalidProxyLink(link))
            }
            Ok(Err(source)) => Err(GatewayError::Download {
                indexer: indexer.id().to_string(),
                source,
            }),
            Err(_) => Err(GatewayError::IndexerTimeout {
                indexer: indexer.id().to_string(),
                timeout_secs: self.settings.dispatch_timeout.as_secs(),
            }),
        }
    }

    fn caps(&self, indexer: &dyn Indexer) -> Result<TorznabResponse> {
        self.stats.caps_requests.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Serving capabilities for {}", indexer.id());
        Ok(TorznabResponse::Caps(indexer.capabilities().to_xml()?))
    }

    /// 在超时内等待后端查询
    ///
    /// 查询在请求 future 内执行，请求被丢弃时后端 I/O 随之取消。
    async fn dispatch(&self, indexer: &dyn Indexer, query: &TorznabQuery) -> Result<Vec<ReleaseInfo>> {
        counter!("torznab_gateway_dispatch_total", "indexer" => indexer.id().to_string()).increment(1);

        let mut guard = DispatchGuard::new(indexer.id());
        let outcome = timeout(self.settings.dispatch_timeout, indexer.perform_query(query)).await;
        guard.finish();

        match outcome {
            Ok(Ok(releases)) => Ok(releases),
            Ok(Err(IndexerError::Unsupported(reason))) => {
                tracing::debug!("{} rejected {}: {}", indexer.id(), query.query_type, reason);
                Err(GatewayError::UnsupportedQuery {
                    indexer: indexer.id().to_string(),
                    query_type: query.query_type.to_string(),
                })
            }
            Ok(Err(source)) => {
                self.stats.dispatch_failures.fetch_add(1, Ordering::Relaxed);
                counter!("torznab_gateway_dispatch_failures_total", "indexer" => indexer.id().to_string())
                    .increment(1);
                tracing::warn!("Indexer {} failed: {}", indexer.id(), source);
                Err(GatewayError::IndexerQuery {
                    indexer: indexer.id().to_string(),
                    source,
                })
            }
            Err(_) => {
                self.stats.timeouts.fetch_add(1, Ordering::Relaxed);
                counter!("torznab_gateway_dispatch_timeouts_total", "indexer" => indexer.id().to_string())
                    .increment(1);
                tracing::warn!(
                    "Indexer {} timed out after {:?}",
                    indexer.id(),
                    self.settings.dispatch_timeout
                );
                Err(GatewayError::IndexerTimeout {
                    indexer: indexer.id().to_string(),
                    timeout_secs: self.settings.dispatch_timeout.as_secs(),
                })
            }
        }
    }

    /// 写缓存；失败只记录日志
    async fn cache_results(&self, indexer_id: &str, releases: &[ReleaseInfo]) {
        match self.cache.put(indexer_id, releases.to_vec()).await {
            Ok(()) => {
                self.stats.cache_writes.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("Failed to cache results for {}: {}", indexer_id, e);
            }
        }
    }

    fn log_found(&self, indexer: &dyn Indexer, query: &TorznabQuery, count: usize) {
        if query.is_feed() {
            tracing::info!("Found {} releases from {}", count, indexer.display_name());
        } else {
            tracing::info!(
                "Found {} releases from {} for: {}",
                count,
                indexer.display_name(),
                query.full_search_string()
            );
        }
    }

    fn assemble(
        &self,
        indexer: &dyn Indexer,
        releases: Vec<ReleaseInfo>,
        ctx: &RequestContext,
    ) -> Result<String> {
        let channel = ChannelInfo::for_indexer(indexer, &ctx.server_url);
        let releases = releases
            .into_iter()
            .map(|release| release.into_proxy_link(&ctx.server_url, indexer.id()))
            .collect();

        let self_link = format!("{}api/{}", ctx.server_url, indexer.id());
        ResultPage::new(channel, releases).to_xml(&self_link)
    }

    /// 获取统计信息
    pub fn get_stats(&self) -> PipelineStatsResult {
        PipelineStatsResult {
            total_requests: self.stats.total_requests.load(Ordering::Relaxed),
            caps_requests: self.stats.caps_requests.load(Ordering::Relaxed),
            auth_failures: self.stats.auth_failures.load(Ordering::Relaxed),
            dispatch_failures: self.stats.dispatch_failures.load(Ordering::Relaxed),
            timeouts: self.stats.timeouts.load(Ordering::Relaxed),
            cache_writes: self.stats.cache_writes.load(Ordering::Relaxed),
        }
    }
}

/// 后端查询守卫
///
/// 查询完成前被丢弃即视为取消。
struct DispatchGuard<'a> {
    indexer: &'a str,
    started: Instant,
    finished: bool,
}

impl<'a> DispatchGuard<'a> {
    fn new(indexer: &'a str) -> Self {
        Self {
            indexer,
            started: Instant::now(),
            finished: false,
        }
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::info!(
                "Request to {} was cancelled after {:?}",
                self.indexer,
                self.started.elapsed()
            );
        }
    }
}

/// 管线统计
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub total_requests: AtomicU64,
    pub caps_requests: AtomicU64,
    pub auth_failures: AtomicU64,
    pub dispatch_failures: AtomicU64,
    pub timeouts: AtomicU64,
    pub cache_writes: AtomicU64,
}

/// 管线统计快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStatsResult {
    pub total_requests: u64,
    pub caps_requests: u64,
    pub auth_failures: u64,
    pub dispatch_failures: u64,
    pub timeouts: u64,
    pub cache_writes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, CachedResult, MemoryCacheService};
    use crate::torznab::TorznabCapabilities;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use tokio::sync::Notify;

    const SERVER: &str = "http://localhost:9117/";

    enum Behavior {
        Releases(Vec<ReleaseInfo>),
        Fail,
        Unsupported,
        Hang,
    }

    struct MockIndexer {
        id: String,
        configured: bool,
        caps: TorznabCapabilities,
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl MockIndexer {
        fn new(id: &str, behavior: Behavior) -> Self {
            Self {
                id: id.to_string(),
                configured: true,
                caps: TorznabCapabilities::with_categories(&[5000, 5040]),
                behavior,
                calls: AtomicUsize::new(0),
            }
        }

        fn unconfigured(id: &str) -> Self {
            Self {
                configured: false,
                ..Self::new(id, Behavior::Releases(Vec::new()))
            }
        }
    }

    #[async_trait]
    impl Indexer for MockIndexer {
        fn id(&self) -> &str {
            &self.id
        }
        fn display_name(&self) -> &str {
            "Mock Indexer"
        }
        fn display_description(&self) -> &str {
            "A mock indexer"
        }
        fn site_link(&self) -> &str {
            "https://mock.example/"
        }
        fn is_configured(&self) -> bool {
            self.configured
        }
        fn capabilities(&self) -> &TorznabCapabilities {
            &self.caps
        }
        async fn perform_query(&self, _query: &TorznabQuery) -> std::result::Result<Vec<ReleaseInfo>, IndexerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Releases(releases) => Ok(releases.clone()),
                Behavior::Fail => Err(IndexerError::Parse("boom".to_string())),
                Behavior::Unsupported => Err(IndexerError::Unsupported("movie".to_string())),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Vec::new())
                }
            }
        }
    }

    /// 记录写入次数的缓存
    #[derive(Default)]
    struct RecordingCache {
        writes: Mutex<Vec<(String, usize)>>,
        fail: bool,
    }

    #[async_trait]
    impl CacheService for RecordingCache {
        async fn put(&self, indexer_id: &str, items: Vec<ReleaseInfo>) -> std::result::Result<(), CacheError> {
            if self.fail {
                return Err(CacheError::Serialization(
                    serde_json::from_str::<u32>("x").unwrap_err(),
                ));
            }
            self.writes.lock().unwrap().push((indexer_id.to_string(), items.len()));
            Ok(())
        }
        async fn get(&self, _indexer_id: &str) -> std::result::Result<Option<CachedResult>, CacheError> {
            Ok(None)
        }
        async fn entries(&self) -> std::result::Result<Vec<CachedResult>, CacheError> {
            Ok(Vec::new())
        }
    }

    fn release(title: &str, categories: &[u32]) -> ReleaseInfo {
        ReleaseInfo {
            title: title.to_string(),
            link: Some(format!("https://mock.example/dl/{}.torrent", title)),
            categories: categories.to_vec(),
            ..Default::default()
        }
    }

    fn three_releases() -> Vec<ReleaseInfo> {
        vec![
            release("Show.S01E01", &[5040]),
            release("Show.S01E02", &[5040]),
            release("Film", &[2040]),
        ]
    }

    fn settings() -> PipelineSettings {
        PipelineSettings {
            api_key: "SecretKey".to_string(),
            caps_require_api_key: false,
            insecure_skip_api_key: false,
            dispatch_timeout: Duration::from_secs(5),
        }
    }

    fn interface(indexer: Arc<dyn Indexer>, cache: Arc<dyn CacheService>, settings: PipelineSettings) -> TorznabInterface {
        let manager = Arc::new(IndexerManager::new());
        manager.register(indexer);
        TorznabInterface::new(settings, manager, cache)
    }

    fn ctx() -> RequestContext {
        RequestContext::new(SERVER, "127.0.0.1:50000".parse().ok())
    }

    #[tokio::test]
    async fn test_caps_skips_auth_and_dispatch() {
        let indexer = Arc::new(MockIndexer::new("x", Behavior::Fail));
        let api = interface(indexer.clone(), Arc::new(RecordingCache::default()), settings());

        let response = api.handle("x", "t=caps&apikey=WRONG", &ctx()).await.unwrap();
        assert!(matches!(response, TorznabResponse::Caps(_)));
        assert!(response.body().contains("<caps>"));
        assert_eq!(indexer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(api.get_stats().caps_requests, 1);
    }

    #[tokio::test]
    async fn test_caps_can_require_api_key() {
        let indexer = Arc::new(MockIndexer::new("x", Behavior::Fail));
        let mut settings = settings();
        settings.caps_require_api_key = true;
        let api = interface(indexer, Arc::new(RecordingCache::default()), settings);

        assert!(matches!(
            api.handle("x", "t=caps&apikey=WRONG", &ctx()).await,
            Err(GatewayError::InvalidApiKey)
        ));
        assert!(api.handle("x", "t=caps&apikey=secretkey", &ctx()).await.is_ok());
    }

    #[tokio::test]
    async fn test_wrong_api_key_never_dispatches() {
        let indexer = Arc::new(MockIndexer::new("x", Behavior::Releases(three_releases())));
        let cache = Arc::new(RecordingCache::default());
        let api = interface(indexer.clone(), cache.clone(), settings());

        let err = api.handle("x", "t=search&q=foo&apikey=WRONG", &ctx()).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidApiKey));
        assert_eq!(err.to_string(), "Incorrect API key");
        assert_eq!(indexer.calls.load(Ordering::SeqCst), 0);
        assert!(cache.writes.lock().unwrap().is_empty());
        assert_eq!(api.get_stats().auth_failures, 1);
    }

    #[tokio::test]
    async fn test_api_key_is_case_insensitive() {
        let indexer = Arc::new(MockIndexer::new("x", Behavior::Releases(Vec::new())));
        let api = interface(indexer, Arc::new(RecordingCache::default()), settings());
        assert!(api.handle("x", "t=search&apikey=SECRETKEY", &ctx()).await.is_ok());
    }

    #[tokio::test]
    async fn test_padded_configured_key_still_authenticates() {
        let server = ServerConfig {
            api_key: "secret ".to_string(),
            ..ServerConfig::default()
        };
        let indexer = Arc::new(MockIndexer::new("x", Behavior::Releases(Vec::new())));
        let api = interface(
            indexer,
            Arc::new(RecordingCache::default()),
            PipelineSettings::from_config(&server),
        );

        assert!(api.handle("x", "t=search&apikey=secret%20", &ctx()).await.is_ok());
        assert!(api.handle("x", "t=search&apikey=secret", &ctx()).await.is_ok());
    }

    #[tokio::test]
    async fn test_insecure_skip_api_key() {
        let indexer = Arc::new(MockIndexer::new("x", Behavior::Releases(Vec::new())));
        let mut settings = settings();
        settings.insecure_skip_api_key = true;
        let api = interface(indexer, Arc::new(RecordingCache::default()), settings);
        assert!(api.handle("x", "t=search", &ctx()).await.is_ok());
    }

    #[tokio::test]
    async fn test_unconfigured_indexer_is_forbidden() {
        let indexer = Arc::new(MockIndexer::unconfigured("y"));
        let api = interface(indexer.clone(), Arc::new(RecordingCache::default()), settings());

        let err = api.handle("y", "t=search&q=foo&apikey=SecretKey", &ctx()).await.unwrap_err();
        assert!(matches!(err, GatewayError::IndexerUnconfigured { .. }));
        assert!(err.to_string().contains("Mock Indexer"));
        assert_eq!(indexer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_feed_query_is_cached_unfiltered() {
        let indexer = Arc::new(MockIndexer::new("z", Behavior::Releases(three_releases())));
        let cache = Arc::new(MemoryCacheService::new(100));
        let api = interface(indexer, cache.clone(), settings());

        let response = api
            .handle("z", "t=search&q=&cat=5000&apikey=SecretKey", &ctx())
            .await
            .unwrap();
        let TorznabResponse::Feed(xml) = response else {
            panic!("expected a feed");
        };
        assert_eq!(xml.matches("<item>").count(), 2);

        let cached = cache.get("z").await.unwrap().unwrap();
        assert_eq!(cached.items.len(), 3);
        assert_eq!(cached.items, three_releases());
        assert_eq!(api.get_stats().cache_writes, 1);
    }

    #[tokio::test]
    async fn test_search_query_is_not_cached() {
        let indexer = Arc::new(MockIndexer::new("z", Behavior::Releases(three_releases())));
        let cache = Arc::new(RecordingCache::default());
        let api = interface(indexer, cache.clone(), settings());

        api.handle("z", "t=search&q=show&apikey=SecretKey", &ctx()).await.unwrap();
        assert!(cache.writes.lock().unwrap().is_empty());

        api.handle("z", "t=search&q=%3C%3E&apikey=SecretKey", &ctx()).await.unwrap();
        assert_eq!(cache.writes.lock().unwrap().as_slice(), &[("z".to_string(), 3)]);
    }

    #[tokio::test]
    async fn test_cache_failure_is_swallowed() {
        let indexer = Arc::new(MockIndexer::new("z", Behavior::Releases(three_releases())));
        let cache = Arc::new(RecordingCache {
            fail: true,
            ..Default::default()
        });
        let api = interface(indexer, cache, settings());

        let response = api.handle("z", "apikey=SecretKey", &ctx()).await.unwrap();
        assert_eq!(response.body().matches("<item>").count(), 3);
    }

    #[tokio::test]
    async fn test_links_point_back_through_gateway() {
        let indexer = Arc::new(MockIndexer::new("z", Behavior::Releases(three_releases())));
        let api = interface(indexer, Arc::new(RecordingCache::default()), settings());

        let first = api.handle("z", "apikey=SecretKey", &ctx()).await.unwrap();
        let second = api.handle("z", "apikey=SecretKey", &ctx()).await.unwrap();
        assert_eq!(first, second);

        let prefix = format!("{}api/z/download/", SERVER);
        let body = first.into_body();
        let start = body.find(&prefix).unwrap() + prefix.len();
        let encoded = &body[start..start + body[start..].find('/').unwrap()];
        assert_eq!(
            decode_proxy_link(encoded).unwrap().as_str(),
            "https://mock.example/dl/Show.S01E01.torrent"
        );
        assert!(body.contains("http://localhost:9117/logos/z.png"));
    }

    #[tokio::test]
    async fn test_episode_filter_and_window() {
        let indexer = Arc::new(MockIndexer::new("z", Behavior::Releases(three_releases())));
        let api = interface(indexer, Arc::new(RecordingCache::default()), settings());

        let response = api
            .handle("z", "t=tvsearch&q=show&season=1&ep=2&apikey=SecretKey", &ctx())
            .await
            .unwrap();
        assert_eq!(response.body().matches("<item>").count(), 1);
        assert!(response.body().contains("Show.S01E02"));

        let response = api
            .handle("z", "apikey=SecretKey&offset=1&limit=1", &ctx())
            .await
            .unwrap();
        assert_eq!(response.body().matches("<item>").count(), 1);
        assert!(response.body().contains("<title>Show.S01E02</title>"));
    }

    #[tokio::test]
    async fn test_backend_failure() {
        let indexer = Arc::new(MockIndexer::new("x", Behavior::Fail));
        let api = interface(indexer, Arc::new(RecordingCache::default()), settings());

        let err = api.handle("x", "t=search&q=foo&apikey=SecretKey", &ctx()).await.unwrap_err();
        assert!(matches!(err, GatewayError::IndexerQuery { .. }));
        assert_eq!(api.get_stats().dispatch_failures, 1);
    }

    #[tokio::test]
    async fn test_backend_rejects_query_type() {
        let indexer = Arc::new(MockIndexer::new("x", Behavior::Unsupported));
        let api = interface(indexer, Arc::new(RecordingCache::default()), settings());

        let err = api.handle("x", "t=movie&q=foo&apikey=SecretKey", &ctx()).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::UnsupportedQuery { ref query_type, .. } if query_type == "movie"
        ));
    }

    #[tokio::test]
    async fn test_backend_timeout() {
        let indexer = Arc::new(MockIndexer::new("x", Behavior::Hang));
        let mut settings = settings();
        settings.dispatch_timeout = Duration::from_millis(50);
        let api = interface(indexer, Arc::new(RecordingCache::default()), settings);

        let err = api.handle("x", "t=search&q=foo&apikey=SecretKey", &ctx()).await.unwrap_err();
        assert!(matches!(err, GatewayError::IndexerTimeout { .. }));
        assert_eq!(api.get_stats().timeouts, 1);
    }

    #[tokio::test]
    async fn test_unknown_indexer_and_malformed_query() {
        let indexer = Arc::new(MockIndexer::new("x", Behavior::Releases(Vec::new())));
        let api = interface(indexer, Arc::new(RecordingCache::default()), settings());

        assert!(matches!(
            api.handle("nope", "t=caps", &ctx()).await,
            Err(GatewayError::IndexerNotFound(_))
        ));
        assert!(matches!(
            api.handle("x", "t=tvsearch&season=abc&apikey=SecretKey", &ctx()).await,
            Err(GatewayError::MalformedQuery(_))
        ));
    }

    /// 请求被丢弃时后端查询随之取消
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    struct SlowIndexer {
        caps: TorznabCapabilities,
        started: Arc<Notify>,
        dropped: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Indexer for SlowIndexer {
        fn id(&self) -> &str {
            "slow"
        }
        fn display_name(&self) -> &str {
            "Slow"
        }
        fn display_description(&self) -> &str {
            ""
        }
        fn site_link(&self) -> &str {
            "https://slow.example/"
        }
        fn is_configured(&self) -> bool {
            true
        }
        fn capabilities(&self) -> &TorznabCapabilities {
            &self.caps
        }
        async fn perform_query(&self, _query: &TorznabQuery) -> std::result::Result<Vec<ReleaseInfo>, IndexerError> {
            let _flag = DropFlag(self.dropped.clone());
            self.started.notify_one();
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_dropping_request_cancels_backend() {
        let started = Arc::new(Notify::new());
        let dropped = Arc::new(AtomicBool::new(false));
        let indexer = Arc::new(SlowIndexer {
            caps: TorznabCapabilities::default(),
            started: started.clone(),
            dropped: dropped.clone(),
        });
        let api = Arc::new(interface(indexer, Arc::new(RecordingCache::default()), settings()));

        let task = {
            let api = api.clone();
            tokio::spawn(async move { api.handle("slow", "t=search&apikey=SecretKey", &ctx()).await })
        };

        started.notified().await;
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert!(dropped.load(Ordering::SeqCst));
    }
}
