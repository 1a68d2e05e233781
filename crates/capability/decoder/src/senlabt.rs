//! Senlab T（探头温度传感器）解码器
//!
//! 报文为信封数组，每个信封携带 hex 编码的二进制帧：
//!
//! ```json
//! [{ "devEui": "70b3d580a010f260", "payload": "01fe0020", "timestamp": "2022-04-12T05:08:50.301Z" }]
//! ```

use crate::error::DecodeError;
use crate::frame::{MIN_FRAME_LEN, decode_frame};
use crate::{Emit, MessageDecoder, emit_checked};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    dev_eui: String,
    payload: String,
    timestamp: String,
}

/// 输出的读数记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeRecord {
    pub dev_eui: String,
    pub id: u8,
    pub battery_level: u8,
    pub temperature: f32,
    pub timestamp: String,
}

/// Senlab T 解码器。
///
/// 任一信封失败即中止整批，之前已 emit 的读数不会撤回。
#[derive(Debug, Default)]
pub struct SenlabTDecoder;

#[async_trait]
impl MessageDecoder for SenlabTDecoder {
    async fn decode(
        &self,
        ctx: &CancellationToken,
        payload: &[u8],
        emit: &dyn Emit,
    ) -> Result<(), DecodeError> {
        let envelopes: Vec<Envelope> = serde_json::from_slice(payload)
            .map_err(|err| DecodeError::MalformedEnvelope(err.to_string()))?;

        for envelope in envelopes {
            let frame = hex::decode(envelope.payload.trim())
                .map_err(|err| DecodeError::MalformedHex(err.to_string()))?;
            if frame.len() < MIN_FRAME_LEN {
                return Err(DecodeError::ShortFrame {
                    expected: MIN_FRAME_LEN,
                    actual: frame.len(),
                });
            }

            let reading = decode_frame(&frame)?;
            let record = ProbeRecord {
                dev_eui: envelope.dev_eui,
                id: reading.probe_id,
                battery_level: reading.battery_level,
                temperature: reading.temperature,
                timestamp: envelope.timestamp,
            };
            debug!(
                target: "iot.decoder",
                dev_eui = %record.dev_eui,
                probe_id = record.id,
                battery_level = record.battery_level,
                temperature = record.temperature,
                "probe_reading_decoded"
            );

            let bytes =
                serde_json::to_vec(&record).map_err(|err| DecodeError::Encode(err.to_string()))?;
            emit_checked(ctx, emit, bytes).await?;
        }

        Ok(())
    }
}
