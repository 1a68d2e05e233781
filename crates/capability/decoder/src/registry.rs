//! 设备类型 → 解码器注册表

use crate::elsys::ElsysDecoder;
use crate::error::DecodeError;
use crate::senlabt::SenlabTDecoder;
use crate::{DefaultDecoder, Emit, MessageDecoder};
use domain::RawUplink;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// 已知设备类型（封闭集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    SenlabT,
    Elsys,
}

impl DeviceType {
    /// 从上行报文携带的设备类型 key 解析，大小写不敏感。
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "senlabt" | "senlab-t" | "senlabt_basic" => Some(Self::SenlabT),
            "elsys" | "elsys_codec" => Some(Self::Elsys),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SenlabT => "senlabt",
            Self::Elsys => "elsys",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 解码器注册表。
///
/// 构造完成后只读；未注册的设备类型使用透传解码器。
#[derive(Clone)]
pub struct DecoderRegistry {
    decoders: HashMap<DeviceType, Arc<dyn MessageDecoder>>,
    fallback: Arc<dyn MessageDecoder>,
}

impl DecoderRegistry {
    /// 注册全部内置解码器。
    pub fn new() -> Self {
        Self::empty()
            .with_decoder(DeviceType::SenlabT, Arc::new(SenlabTDecoder))
            .with_decoder(DeviceType::Elsys, Arc::new(ElsysDecoder))
    }

    /// 只有透传解码器的注册表。
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
            fallback: Arc::new(DefaultDecoder),
        }
    }

    pub fn with_decoder(
        mut self,
        device_type: DeviceType,
        decoder: Arc<dyn MessageDecoder>,
    ) -> Self {
        self.decoders.insert(device_type, decoder);
        self
    }

    /// 按设备类型 key 选择解码器。
    pub fn decoder_for(&self, device_type: &str) -> Arc<dyn MessageDecoder> {
        DeviceType::from_key(device_type)
            .and_then(|kind| self.decoders.get(&kind).cloned())
            .unwrap_or_else(|| self.fallback.clone())
    }

    /// 解码一条上行报文。
    pub async fn decode(
        &self,
        ctx: &CancellationToken,
        uplink: &RawUplink,
        emit: &dyn Emit,
    ) -> Result<(), DecodeError> {
        let known = DeviceType::from_key(&uplink.device_type);
        debug!(
            target: "iot.decoder",
            device_type = %uplink.device_type,
            decoder = known.map(|kind| kind.as_str()).unwrap_or("default"),
            payload_size = uplink.payload.len(),
            "uplink_dispatch"
        );

        let decoder = self.decoder_for(&uplink.device_type);
        decoder
            .decode(ctx, &uplink.payload, emit)
            .await
            .inspect_err(|err| {
                warn!(
                    target: "iot.decoder",
                    device_type = %uplink.device_type,
                    error = %err,
                    "uplink_decode_failed"
                );
            })
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
