//! 规范化读数 → 内部消息格式的转换，以及 SenML 打包。

mod senml;

use domain::{InternalMessageFormat, MessageValue};

pub use senml::{SENSOR_VALUE, SenmlPack, SenmlRecord, UNIT_CELSIUS, UNIT_JOULE, UNIT_WATT};

/// 温度（LwM2M 3303）
pub const TEMPERATURE_URN: &str = "urn:oma:lwm2m:ext:3303";
/// 功率（LwM2M 3328）
pub const POWER_URN: &str = "urn:oma:lwm2m:ext:3328";
/// 能量（LwM2M 3331）
pub const ENERGY_URN: &str = "urn:oma:lwm2m:ext:3331";

/// 转换错误。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    #[error("unsupported measurement type: {0}")]
    UnsupportedType(String),
    #[error("invalid reading: {0}")]
    InvalidReading(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
}

/// 读数转换器。
///
/// 测量类型在构造时确定，之后不可变。
#[derive(Debug, Clone)]
pub struct MessageConverter {
    measurement_type: String,
}

impl MessageConverter {
    pub fn new(measurement_type: impl Into<String>) -> Self {
        Self {
            measurement_type: measurement_type.into(),
        }
    }

    pub fn temperature() -> Self {
        Self::new(TEMPERATURE_URN)
    }

    pub fn measurement_type(&self) -> &str {
        &self.measurement_type
    }

    /// 把一条解码后的读数记录（JSON）转换为内部消息格式。
    pub fn convert_payload(
        &self,
        internal_id: &str,
        msg: &[u8],
    ) -> Result<InternalMessageFormat, ConversionError> {
        let reading: serde_json::Value = serde_json::from_slice(msg)
            .map_err(|err| ConversionError::InvalidReading(err.to_string()))?;

        let value = match self.measurement_type.as_str() {
            TEMPERATURE_URN => MessageValue {
                temperature: temperature_of(&reading)?,
            },
            other => return Err(ConversionError::UnsupportedType(other.to_string())),
        };

        Ok(InternalMessageFormat {
            internal_id: internal_id.to_string(),
            measurement_type: self.measurement_type.clone(),
            value,
        })
    }
}

// 探头传感器上报 temperature，外接探头的 Elsys 设备上报 externalTemperature
fn temperature_of(reading: &serde_json::Value) -> Result<f64, ConversionError> {
    ["temperature", "externalTemperature"]
        .iter()
        .find_map(|key| reading.get(*key).and_then(serde_json::Value::as_f64))
        .ok_or(ConversionError::MissingValue("temperature"))
}
