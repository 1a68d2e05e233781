//! HTTP 响应辅助函数
//!
//! 上行接口返回统一的 JSON 错误体 `{"code": ..., "message": ...}`；
//! Schneider 接口沿用纯文本错误体。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use iot_decoder::DecodeError;
use iot_telemetry::RequestIds;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    pub request_id: String,
}

pub fn error_response(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    ids: &RequestIds,
) -> Response {
    (
        status,
        Json(ErrorBody {
            code,
            message: message.into(),
            request_id: ids.request_id.clone(),
        }),
    )
        .into_response()
}

/// 解码链路错误 → HTTP 响应
///
/// 报文本身的问题返回 400；下游发送失败返回 500；服务关闭中返回 503。
pub fn decode_error(err: DecodeError, ids: &RequestIds) -> Response {
    match err {
        DecodeError::Emit(message) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "SEND.FAILED", message, ids)
        }
        DecodeError::Encode(message) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL.ERROR", message, ids)
        }
        DecodeError::Cancelled => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE.SHUTTING_DOWN",
            "cancelled",
            ids,
        ),
        other => error_response(
            StatusCode::BAD_REQUEST,
            "INVALID.PAYLOAD",
            other.to_string(),
            ids,
        ),
    }
}

/// 纯文本 500 响应
pub fn internal_text_error(message: impl Into<String>) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, message.into()).into_response()
}
