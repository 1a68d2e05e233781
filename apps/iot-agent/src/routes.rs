//! 路由定义
//!
//! - 健康检查：GET /health
//! - 上行报文：POST /api/v0/messages?type=<device type>
//! - Schneider 数据：POST /api/v0/schneider

use crate::AppState;
use crate::handlers::*;
use crate::middleware::request_context;
use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v0/messages", post(receive_uplink))
        .route("/api/v0/schneider", post(receive_schneider))
        .with_state(state)
        // 注入 request_id/trace_id
        .layer(from_fn(request_context))
        .layer(TraceLayer::new_for_http())
}
