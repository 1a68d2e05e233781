//! 健康检查

use crate::AppState;
use axum::{Json, extract::State, response::IntoResponse};

/// `GET /health`，附带事件发送器当前状态。
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let sender = state.sender.status().await;
    Json(serde_json::json!({ "ok": true, "sender": sender.to_string() }))
}
