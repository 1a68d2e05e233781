use crate::SenderStatus;

/// 事件发送错误。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EventError {
    /// 发送器未处于 Started 状态（尚未启动或已停止）
    #[error("sender not started")]
    NotStarted,
    #[error("invalid sender state: {0}")]
    InvalidState(SenderStatus),
    /// 传输层错误，原样透传
    #[error("transport error: {0}")]
    Transport(String),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("cancelled")]
    Cancelled,
}
