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

//! 索引器图标处理器
//!
//! 从 `logos_dir` 提供 `{id}.png`

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::api::on::ApiState;
use crate::error::{GatewayError, Result};

/// 处理 `/logos/{file}`
pub async fn handle_logo(
    State(state): State<ApiState>,
    Path(file): Path<String>,
) -> Result<Response> {
    if !is_logo_file_name(&file) {
        return Err(GatewayError::NotFound(format!("logo {}", file)));
    }

    let path = state.logos_dir.join(&file);
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(([(header::CONTENT_TYPE, "image/png")], bytes).into_response()),
        Err(e) => {
            tracing::debug!("Logo {} unavailable: {}", path.display(), e);
            Err(GatewayError::NotFound(format!("logo {}", file)))
        }
    }
}

/// 只接受 `[A-Za-z0-9_-]+.png`
fn is_logo_file_name(file: &str) -> bool {
    file.strip_suffix(".png")
        .map(|stem| {
            !stem.is_empty()
                && stem
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logo_file_names() {
        assert!(is_logo_file_name("demo.png"));
        assert!(is_logo_file_name("my-indexer_2.png"));
        assert!(!is_logo_file_name(".png"));
        assert!(!is_logo_file_name("../secret.png"));
        assert!(!is_logo_file_name("demo.svg"));
    }
}
