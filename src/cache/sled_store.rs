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

//! sled 持久化缓存
//!
//! 记录以 JSON 存放在 `results` 树中，键为索引器标识。

use async_trait::async_trait;
use std::path::Path;

use super::{CacheError, CacheService, CachedResult};
use crate::torznab::ReleaseInfo;

const RESULTS_TREE: &str = "results";

pub struct SledCacheService {
    tree: sled::Tree,
    max_items: usize,
}

impl SledCacheService {
    pub fn open(path: impl AsRef<Path>, max_items: usize) -> Result<Self, CacheError> {
        let db = sled::open(path)?;
        Self::from_db(&db, max_items)
    }

    pub fn from_db(db: &sled::Db, max_items: usize) -> Result<Self, CacheError> {
        Ok(Self {
            tree: db.open_tree(RESULTS_TREE)?,
            max_items,
        })
    }
}

#[async_trait]
impl CacheService for SledCacheService {
    async fn put(&self, indexer_id: &str, items: Vec<ReleaseInfo>) -> Result<(), CacheError> {
        let entry = CachedResult::new(indexer_id, items, self.max_items);
        let value = serde_json::to_vec(&entry)?;
        self.tree.insert(indexer_id.as_bytes(), value)?;
        tracing::debug!("Persisted {} releases for {}", entry.items.len(), indexer_id);
        Ok(())
    }

    async fn get(&self, indexer_id: &str) -> Result<Option<CachedResult>, CacheError> {
        match self.tree.get(indexer_id.as_bytes())? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    async fn entries(&self) -> Result<Vec<CachedResult>, CacheError> {
        let mut entries = Vec::new();
        for item in self.tree.iter() {
            let (_, value) = item?;
            match serde_json::from_slice::<CachedResult>(&value) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!("Skipping unreadable cache entry: {}", e),
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(title: &str) -> ReleaseInfo {
        ReleaseInfo {
            title: title.to_string(),
            size: Some(1024),
            categories: vec![5040],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SledCacheService::open(dir.path().join("cache"), 10).unwrap();

        cache.put("demo", vec![release("a"), release("b")]).await.unwrap();
        let entry = cache.get("demo").await.unwrap().unwrap();
        assert_eq!(entry.items, vec![release("a"), release("b")]);
        assert!(cache.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_handles_share_one_database() {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path().join("cache")).unwrap();

        let writer = SledCacheService::from_db(&db, 1).unwrap();
        writer.put("demo", vec![release("a"), release("b")]).await.unwrap();

        let reader = SledCacheService::from_db(&db, 1).unwrap();
        let entries = reader.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].items.len(), 1);
        assert_eq!(reader.recent(5).await.unwrap()[0].release.title, "a");
    }
}
