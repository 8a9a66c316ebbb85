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

//! 结果过滤
//!
//! 过滤只删除不匹配的条目，从不重新排序。

use super::caps::TorznabCapabilities;
use super::categories::TorznabCategory;
use super::query::TorznabQuery;
use super::release::ReleaseInfo;

/// 通用过滤：分类收窄、季集匹配与 IMDb 编号匹配
///
/// 没有 IMDb 编号的条目不会因 `imdbid` 被剔除。
pub fn filter_results(query: &TorznabQuery, releases: Vec<ReleaseInfo>) -> Vec<ReleaseInfo> {
    let episode = query.episode_search_string().to_lowercase();
    let imdb = query.imdb_number();

    releases
        .into_iter()
        .filter(|release| category_matches(&query.categories, &release.categories))
        .filter(|release| episode.is_empty() || release.title.to_lowercase().contains(&episode))
        .filter(|release| match (imdb, release.imdb) {
            (Some(wanted), Some(actual)) => wanted == actual,
            _ => true,
        })
        .collect()
}

/// 按 `offset`、`limit` 截取窗口
///
/// 未给出 `limit` 时取能力文档的默认条数，且不超过其上限。
pub fn paginate(
    query: &TorznabQuery,
    caps: &TorznabCapabilities,
    releases: Vec<ReleaseInfo>,
) -> Vec<ReleaseInfo> {
    let offset = query.offset.unwrap_or(0);
    let limit = query
        .limit
        .unwrap_or(caps.limits_default)
        .min(caps.limits_max);
    releases.into_iter().skip(offset).take(limit).collect()
}

/// 顶级分类 `N000` 匹配 `N000..N999` 内的全部子分类
fn category_matches(wanted: &[u32], actual: &[u32]) -> bool {
    if wanted.is_empty() || actual.is_empty() {
        return true;
    }

    actual.iter().any(|cat| {
        wanted.iter().any(|want| {
            want == cat
                || (TorznabCategory::is_parent_id(*want)
                    && TorznabCategory::parent_id(*cat) == *want)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(title: &str, categories: &[u32]) -> ReleaseInfo {
        ReleaseInfo {
            title: title.to_string(),
            categories: categories.to_vec(),
            ..Default::default()
        }
    }

    fn titles(releases: &[ReleaseInfo]) -> Vec<&str> {
        releases.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn test_no_constraints_keeps_everything() {
        let input = vec![release("b", &[2000]), release("a", &[5000])];
        let output = filter_results(&TorznabQuery::default(), input.clone());
        assert_eq!(output, input);
    }

    #[test]
    fn test_category_narrowing_preserves_order() {
        let query = TorznabQuery {
            categories: vec![5000],
            ..Default::default()
        };
        let input = vec![
            release("tv-hd", &[5040]),
            release("movie", &[2040]),
            release("uncategorised", &[]),
            release("tv", &[5000]),
        ];

        let output = filter_results(&query, input);
        assert_eq!(titles(&output), vec!["tv-hd", "uncategorised", "tv"]);
    }

    #[test]
    fn test_sub_category_does_not_widen() {
        let query = TorznabQuery {
            categories: vec![5040],
            ..Default::default()
        };
        let output = filter_results(&query, vec![release("sd", &[5030]), release("hd", &[5040])]);
        assert_eq!(titles(&output), vec!["hd"]);
    }

    #[test]
    fn test_episode_matching() {
        let query = TorznabQuery {
            season: Some(1),
            episode: Some("2".to_string()),
            ..Default::default()
        };
        let input = vec![
            release("Show.s01e02.720p", &[]),
            release("Show.S01E03.720p", &[]),
            release("Show.S01E02.1080p", &[]),
        ];

        let output = filter_results(&query, input);
        assert_eq!(titles(&output), vec!["Show.s01e02.720p", "Show.S01E02.1080p"]);
    }

    #[test]
    fn test_paginate() {
        let query = TorznabQuery {
            offset: Some(1),
            limit: Some(2),
            ..Default::default()
        };
        let caps = TorznabCapabilities::default();
        let input = vec![release("a", &[]), release("b", &[]), release("c", &[]), release("d", &[])];
        assert_eq!(titles(&paginate(&query, &caps, input)), vec!["b", "c"]);

        let all = vec![release("a", &[])];
        assert_eq!(paginate(&TorznabQuery::default(), &caps, all).len(), 1);
    }

    #[test]
    fn test_limit_is_clamped_to_caps() {
        let caps = TorznabCapabilities {
            limits_max: 3,
            limits_default: 2,
            ..Default::default()
        };
        let input: Vec<ReleaseInfo> = (0..5).map(|i| release(&i.to_string(), &[])).collect();

        let oversized = TorznabQuery {
            limit: Some(1000),
            ..Default::default()
        };
        assert_eq!(titles(&paginate(&oversized, &caps, input.clone())), vec!["0", "1", "2"]);
        assert_eq!(titles(&paginate(&TorznabQuery::default(), &caps, input)), vec!["0", "1"]);
    }

    #[test]
    fn test_imdb_narrowing_keeps_untagged_releases() {
        let query = TorznabQuery {
            imdb_id: Some("tt0133093".to_string()),
            ..Default::default()
        };
        let input = vec![
            ReleaseInfo { imdb: Some(133093), ..release("match", &[]) },
            ReleaseInfo { imdb: Some(999), ..release("other", &[]) },
            release("untagged", &[]),
        ];

        let output = filter_results(&query, input);
        assert_eq!(titles(&output), vec!["match", "untagged"]);
    }
}
