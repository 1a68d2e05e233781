//! SenML（RFC 8428）数据包构造
//!
//! 基础记录携带设备标识与测量类型 URN，之后每条记录是一个 LwM2M 资源值：
//!
//! ```json
//! [
//!   { "bn": "ventilation-1/3303/", "bt": 1650000000, "n": "0", "vs": "urn:oma:lwm2m:ext:3303" },
//!   { "n": "5700", "u": "Cel", "v": 21.5 }
//! ]
//! ```

use serde::{Deserialize, Serialize};

pub const UNIT_CELSIUS: &str = "Cel";
pub const UNIT_JOULE: &str = "J";
pub const UNIT_WATT: &str = "W";

/// LwM2M "Sensor Value" 资源
pub const SENSOR_VALUE: &str = "5700";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SenmlRecord {
    #[serde(rename = "bn", skip_serializing_if = "Option::is_none")]
    pub base_name: Option<String>,
    #[serde(rename = "bt", skip_serializing_if = "Option::is_none")]
    pub base_time: Option<f64>,
    #[serde(rename = "n", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "u", skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(rename = "v", skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(rename = "vs", skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SenmlPack(pub Vec<SenmlRecord>);

impl SenmlPack {
    /// 创建只含基础记录的数据包。`base_time` 为 Unix 秒。
    pub fn new(device_id: &str, base_name: &str, base_time: f64) -> Self {
        let object_id = base_name.rsplit(':').next().unwrap_or_default();
        Self(vec![SenmlRecord {
            base_name: Some(format!("{device_id}/{object_id}/")),
            base_time: Some(base_time),
            name: Some("0".to_string()),
            string_value: Some(base_name.to_string()),
            ..Default::default()
        }])
    }

    /// 追加一条带单位的数值记录。
    pub fn with_value(mut self, name: &str, unit: &str, value: f64) -> Self {
        self.0.push(SenmlRecord {
            name: Some(name.to_string()),
            unit: (!unit.is_empty()).then(|| unit.to_string()),
            value: Some(value),
            ..Default::default()
        });
        self
    }

    pub fn records(&self) -> &[SenmlRecord] {
        &self.0
    }
}
