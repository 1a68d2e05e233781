//! 解码错误类型定义

/// 解码错误
///
/// 任一错误都会中止当前上行报文的处理，原样返回给调用方，不做重试。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// 信封 JSON 无法解析
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// payload 不是合法的十六进制串
    #[error("malformed hex payload: {0}")]
    MalformedHex(String),

    /// 帧长度不足
    #[error("short frame: expected at least {expected} bytes, got {actual}")]
    ShortFrame { expected: usize, actual: usize },

    /// 未识别或未实现的探头类型
    #[error("unsupported frame: probe type {0}")]
    UnsupportedFrame(u8),

    /// 传感器故障哨兵值
    #[error("sensor fault: reading {0}")]
    SensorFault(f32),

    /// 读数记录序列化失败
    #[error("encode error: {0}")]
    Encode(String),

    /// emit 回调返回的错误
    #[error("emit error: {0}")]
    Emit(String),

    /// 调用方已取消
    #[error("cancelled")]
    Cancelled,
}
