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

//! 指标处理器

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::api::on::ApiState;

/// 处理指标请求（Prometheus格式）
pub async fn handle_metrics(State(state): State<ApiState>) -> Response {
    if let Some(metrics) = state.metrics.get_prometheus_metrics() {
        (StatusCode::OK, metrics).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "Metrics not enabled".to_string(),
        )
            .into_response()
    }
}

/// 处理实时指标请求（JSON格式）
pub async fn handle_realtime_metrics(State(state): State<ApiState>) -> Response {
    let metrics = state.metrics.get_realtime_metrics();
    (StatusCode::OK, Json(metrics)).into_response()
}
