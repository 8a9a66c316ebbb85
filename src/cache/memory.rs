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

//! 内存缓存

use async_trait::async_trait;
use dashmap::DashMap;

use super::{CacheError, CacheService, CachedResult};
use crate::torznab::ReleaseInfo;

pub struct MemoryCacheService {
    entries: DashMap<String, CachedResult>,
    max_items: usize,
}

impl MemoryCacheService {
    pub fn new(max_items: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_items,
        }
    }
}

#[async_trait]
impl CacheService for MemoryCacheService {
    async fn put(&self, indexer_id: &str, items: Vec<ReleaseInfo>) -> Result<(), CacheError> {
        let entry = CachedResult::new(indexer_id, items, self.max_items);
        tracing::debug!("Caching {} releases for {}", entry.items.len(), indexer_id);
        self.entries.insert(indexer_id.to_string(), entry);
        Ok(())
    }

    async fn get(&self, indexer_id: &str) -> Result<Option<CachedResult>, CacheError> {
        Ok(self.entries.get(indexer_id).map(|e| e.value().clone()))
    }

    async fn entries(&self) -> Result<Vec<CachedResult>, CacheError> {
        Ok(self.entries.iter().map(|e| e.value().clone()).collect())
    }
}
