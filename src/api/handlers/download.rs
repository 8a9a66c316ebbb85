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

//! 代理下载处理器

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::api::on::ApiState;
use crate::error::Result;

const TORRENT_CONTENT_TYPE: &str = "application/x-bittorrent";

/// 处理 `/api/{indexer}/download/{link}/{file}`
pub async fn handle_download(
    State(state): State<ApiState>,
    Path((indexer, link, file)): Path<(String, String, String)>,
) -> Result<Response> {
    let bytes = state.torznab.download(&indexer, &link).await?;

    let file = file.replace('"', "");
    Ok((
        [
            (header::CONTENT_TYPE, TORRENT_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file),
            ),
        ],
        bytes,
    )
        .into_response())
}
