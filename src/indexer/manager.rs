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

//! 索引器注册表
//!
//! 进程内共享，启动时注册；查询路径只读，注册不会阻塞并发查找

use dashmap::DashMap;
use std::sync::Arc;

use super::Indexer;
use crate::error::GatewayError;

/// 索引器注册表
#[derive(Default)]
pub struct IndexerManager {
    /// 小写标识 -> 实例
    indexers: DashMap<String, Arc<dyn Indexer>>,
}

impl IndexerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册索引器，同名时替换旧实例
    pub fn register(&self, indexer: Arc<dyn Indexer>) {
        let key = indexer.id().to_lowercase();
        if self.indexers.insert(key, Arc::clone(&indexer)).is_some() {
            tracing::info!("Replaced indexer '{}'", indexer.id());
        } else {
            tracing::debug!("Registered indexer '{}'", indexer.id());
        }
    }

    /// 按标识查找（大小写不敏感）
    pub fn resolve(&self, id: &str) -> Result<Arc<dyn Indexer>, GatewayError> {
        self.indexers
            .get(&id.to_lowercase())
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| GatewayError::IndexerNotFound(id.to_string()))
    }

    /// 所有索引器，按标识排序
    pub fn list(&self) -> Vec<Arc<dyn Indexer>> {
        let mut indexers: Vec<Arc<dyn Indexer>> = self
            .indexers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        indexers.sort_by(|a, b| a.id().cmp(b.id()));
        indexers
    }

    pub fn len(&self) -> usize {
        self.indexers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::IndexerError;
    use crate::torznab::{ReleaseInfo, TorznabCapabilities, TorznabQuery};
    use async_trait::async_trait;

    struct NamedIndexer {
        id: String,
        caps: TorznabCapabilities,
    }

    #[async_trait]
    impl Indexer for NamedIndexer {
        fn id(&self) -> &str {
            &self.id
        }
        fn display_name(&self) -> &str {
            &self.id
        }
        fn display_description(&self) -> &str {
            ""
        }
        fn site_link(&self) -> &str {
            "https://example.org/"
        }
        fn is_configured(&self) -> bool {
            true
        }
        fn capabilities(&self) -> &TorznabCapabilities {
            &self.caps
        }
        async fn perform_query(&self, _query: &TorznabQuery) -> Result<Vec<ReleaseInfo>, IndexerError> {
            Ok(Vec::new())
        }
    }

    fn named(id: &str) -> Arc<dyn Indexer> {
        Arc::new(NamedIndexer {
            id: id.to_string(),
            caps: TorznabCapabilities::default(),
        })
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let manager = IndexerManager::new();
        manager.register(named("Alpha"));

        assert_eq!(manager.resolve("alpha").unwrap().id(), "Alpha");
        assert_eq!(manager.resolve("ALPHA").unwrap().id(), "Alpha");
    }

    #[test]
    fn test_unknown_indexer() {
        let manager = IndexerManager::new();
        assert!(matches!(
            manager.resolve("missing"),
            Err(GatewayError::IndexerNotFound(id)) if id == "missing"
        ));
    }

    #[test]
    fn test_list_is_sorted() {
        let manager = IndexerManager::new();
        manager.register(named("zeta"));
        manager.register(named("alpha"));
        manager.register(named("alpha"));

        let ids: Vec<String> = manager.list().iter().map(|i| i.id().to_string()).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
        assert_eq!(manager.len(), 2);
    }
}
