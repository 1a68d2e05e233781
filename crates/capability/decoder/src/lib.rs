//! # 厂商报文解码能力模块
//!
//! 把各厂商的上行报文解码为规范化读数记录，并通过 `Emit` 回调逐条交给下游：
//!
//! ```text
//! RawUplink (device_type + payload)
//!       │
//!       ▼
//! DecoderRegistry ──► DefaultDecoder（原样透传）
//!       │
//!       ├── SenlabTDecoder（JSON 信封 + hex 二进制帧）
//!       └── ElsysDecoder（网络服务器已解码的 object 字段）
//!       │
//!       ▼
//! Emit::emit（每条读数一次，按产生顺序）
//! ```
//!
//! 解码器本身无状态，可被多个调用方并发使用。

mod elsys;
mod error;
mod frame;
mod registry;
mod senlabt;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub use elsys::{ElsysDecoder, ElsysMeasurements, ElsysRecord};
pub use error::DecodeError;
pub use frame::{
    DecodedReading, FAULT_TEMPERATURE_HIGH, FAULT_TEMPERATURE_LOW, MIN_FRAME_LEN, PROBE_DUAL,
    PROBE_SINGLE, decode_frame,
};
pub use registry::{DecoderRegistry, DeviceType};
pub use senlabt::{ProbeRecord, SenlabTDecoder};

/// 读数回调。
///
/// 返回错误时解码器立即停止并把该错误原样返回；已发出的读数不会撤回。
#[async_trait]
pub trait Emit: Send + Sync {
    async fn emit(&self, ctx: &CancellationToken, record: Vec<u8>) -> Result<(), DecodeError>;
}

/// 报文解码器抽象。
#[async_trait]
pub trait MessageDecoder: Send + Sync {
    async fn decode(
        &self,
        ctx: &CancellationToken,
        payload: &[u8],
        emit: &dyn Emit,
    ) -> Result<(), DecodeError>;
}

/// 默认解码器：原始字节原样交给 emit，恰好一次。
#[derive(Debug, Default)]
pub struct DefaultDecoder;

#[async_trait]
impl MessageDecoder for DefaultDecoder {
    async fn decode(
        &self,
        ctx: &CancellationToken,
        payload: &[u8],
        emit: &dyn Emit,
    ) -> Result<(), DecodeError> {
        emit_checked(ctx, emit, payload.to_vec()).await
    }
}

/// 取消后不再调用 emit。
pub(crate) async fn emit_checked(
    ctx: &CancellationToken,
    emit: &dyn Emit,
    record: Vec<u8>,
) -> Result<(), DecodeError> {
    if ctx.is_cancelled() {
        return Err(DecodeError::Cancelled);
    }
    emit.emit(ctx, record).await
}
