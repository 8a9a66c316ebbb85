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

//! Torznab 标准分类表

use serde::{Deserialize, Serialize};

/// 分类（可包含子分类）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorznabCategory {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub sub_categories: Vec<TorznabCategory>,
}

const STANDARD_CATEGORIES: &[(u32, &str)] = &[
    (1000, "Console"),
    (1010, "Console/NDS"),
    (1020, "Console/PSP"),
    (1030, "Console/Wii"),
    (1040, "Console/XBox"),
    (1050, "Console/XBox 360"),
    (1080, "Console/PS3"),
    (1180, "Console/PS4"),
    (2000, "Movies"),
    (2010, "Movies/Foreign"),
    (2020, "Movies/Other"),
    (2030, "Movies/SD"),
    (2040, "Movies/HD"),
    (2045, "Movies/UHD"),
    (2050, "Movies/BluRay"),
    (2060, "Movies/3D"),
    (3000, "Audio"),
    (3010, "Audio/MP3"),
    (3020, "Audio/Video"),
    (3030, "Audio/Audiobook"),
    (3040, "Audio/Lossless"),
    (4000, "PC"),
    (4010, "PC/0day"),
    (4020, "PC/ISO"),
    (4030, "PC/Mac"),
    (4050, "PC/Games"),
    (5000, "TV"),
    (5020, "TV/Foreign"),
    (5030, "TV/SD"),
    (5040, "TV/HD"),
    (5045, "TV/UHD"),
    (5060, "TV/Sport"),
    (5070, "TV/Anime"),
    (5080, "TV/Documentary"),
    (6000, "XXX"),
    (7000, "Books"),
    (7020, "Books/EBook"),
    (7030, "Books/Comics"),
    (8000, "Other"),
    (8010, "Other/Misc"),
];

impl TorznabCategory {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            sub_categories: Vec::new(),
        }
    }

    /// 按编号查找标准分类
    pub fn standard(id: u32) -> Option<Self> {
        STANDARD_CATEGORIES
            .iter()
            .find(|(cat_id, _)| *cat_id == id)
            .map(|(cat_id, name)| Self::new(*cat_id, *name))
    }

    /// 是否为顶级分类（`N000`）
    pub fn is_parent_id(id: u32) -> bool {
        id % 1000 == 0
    }

    /// 所属顶级分类编号
    pub fn parent_id(id: u32) -> u32 {
        id - id % 1000
    }

    /// 把分类编号列表组织成两级树
    ///
    /// 未知编号会以 "Other" 名称保留；子分类挂到其顶级分类下，顶级分类缺失时自动补上。
    pub fn tree_from_ids(ids: &[u32]) -> Vec<TorznabCategory> {
        let mut roots: Vec<TorznabCategory> = Vec::new();

        for &id in ids {
            let parent = Self::parent_id(id);
            let position = match roots.iter().position(|c| c.id == parent) {
                Some(position) => position,
                None => {
                    roots.push(Self::standard(parent).unwrap_or_else(|| Self::new(parent, "Other")));
                    roots.len() - 1
                }
            };

            if !Self::is_parent_id(id) {
                let root = &mut roots[position];
                if !root.sub_categories.iter().any(|c| c.id == id) {
                    root.sub_categories
                        .push(Self::standard(id).unwrap_or_else(|| Self::new(id, "Other")));
                }
            }
        }

        roots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_lookup() {
        assert_eq!(TorznabCategory::standard(5040).unwrap().name, "TV/HD");
        assert!(TorznabCategory::standard(5041).is_none());
    }

    #[test]
    fn test_parent_id() {
        assert_eq!(TorznabCategory::parent_id(5040), 5000);
        assert_eq!(TorznabCategory::parent_id(2000), 2000);
        assert!(TorznabCategory::is_parent_id(8000));
        assert!(!TorznabCategory::is_parent_id(8010));
    }

    #[test]
    fn test_tree_from_ids() {
        let tree = TorznabCategory::tree_from_ids(&[5030, 5040, 2000, 5030]);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].id, 5000);
        assert_eq!(tree[0].name, "TV");
        assert_eq!(tree[0].sub_categories.len(), 2);
        assert_eq!(tree[1].id, 2000);
        assert!(tree[1].sub_categories.is_empty());
    }
}
