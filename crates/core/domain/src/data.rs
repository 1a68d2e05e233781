use serde::{Deserialize, Serialize};

/// 网络服务器转发的原始上行报文。
///
/// `device_type` 在接入时确定，分发阶段只用它选择一次解码器，之后不再解释。
#[derive(Debug, Clone)]
pub struct RawUplink {
    pub device_type: String,
    pub payload: Vec<u8>,
    /// 厂商提供的到达时间，原样保留，不做解析。
    pub received_at: String,
}

impl RawUplink {
    pub fn new(
        device_type: impl Into<String>,
        payload: Vec<u8>,
        received_at: impl Into<String>,
    ) -> Self {
        Self {
            device_type: device_type.into(),
            payload,
            received_at: received_at.into(),
        }
    }
}

/// 规范化后的测量值容器。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageValue {
    pub temperature: f64,
}

/// 内部统一消息格式：每条解码读数对应一条。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalMessageFormat {
    #[serde(rename = "internalID")]
    pub internal_id: String,
    #[serde(rename = "type")]
    pub measurement_type: String,
    pub value: MessageValue,
}
