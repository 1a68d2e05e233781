//! 上行报文 HTTP 接入
//!
//! `POST /api/v0/messages?type=<device type>`，请求体为设备原始报文，
//! 交给与 MQTT 接入相同的处理链路。
//!
//! - 201：全部读数已发送，返回 `{"readings": n}`
//! - 400：报文无法解码
//! - 500：读数转换或发送失败
//! - 503：服务正在关闭
//!
//! 错误体携带本次请求的 `request_id`，与 `x-request-id` 响应头一致。

use crate::AppState;
use crate::utils::response::decode_error;
use axum::{
    Json,
    body::Bytes,
    extract::{Extension, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::RawUplink;
use iot_ingest::now_epoch_ms;
use iot_telemetry::RequestIds;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct UplinkQuery {
    #[serde(rename = "type")]
    pub device_type: String,
}

pub async fn receive_uplink(
    State(state): State<AppState>,
    Extension(ids): Extension<RequestIds>,
    Query(query): Query<UplinkQuery>,
    body: Bytes,
) -> Response {
    let uplink = RawUplink::new(query.device_type, body.to_vec(), now_epoch_ms().to_string());
    let ctx = state.shutdown.child_token();
    match state.pipeline.process(&ctx, uplink).await {
        Ok(readings) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "readings": readings })),
        )
            .into_response(),
        Err(err) => decode_error(err, &ids),
    }
}
