//! Schneider 楼宇自控数据接入
//!
//! 请求体为 `[{name, value, unit}]`，`value` 是字符串形式的数值。
//! 每个对象构造一个 SenML 数据包并立即转发，任一失败即返回 500，
//! 响应体为错误文本；已转发的数据包不会撤回。

use crate::AppState;
use crate::forwarder::ForwardError;
use crate::utils::response::internal_text_error;
use axum::{
    body::Bytes,
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use iot_conversion::{
    ENERGY_URN, POWER_URN, SENSOR_VALUE, SenmlPack, TEMPERATURE_URN, UNIT_CELSIUS, UNIT_JOULE,
    UNIT_WATT,
};
use iot_telemetry::RequestIds;
use serde::Deserialize;
use tracing::{debug, error};

const NAME_PREFIX: &str = "/Enterprise Server Mitthem/IoT-gränssnitt/MQTT-klient/!UC_Framåt/";
const NAME_SUFFIX: &str = "/Value";

#[derive(Debug, Clone, Deserialize)]
pub struct SchneiderData {
    pub name: String,
    pub value: String,
    pub unit: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SchneiderError {
    #[error("invalid body: {0}")]
    Body(String),
    #[error("name cannot be empty")]
    EmptyName,
    #[error("invalid value {0:?}")]
    InvalidValue(String),
    #[error("unsupported unit {0:?}")]
    UnsupportedUnit(String),
    #[error(transparent)]
    Forward(#[from] ForwardError),
}

/// 去掉楼宇自控系统的路径前缀与 `/Value` 后缀，规整为设备标识。
pub fn trim_name(name: &str) -> Result<String, SchneiderError> {
    if name.is_empty() {
        return Err(SchneiderError::EmptyName);
    }
    let name = name.strip_prefix(NAME_PREFIX).unwrap_or(name);
    let name = name.strip_suffix(NAME_SUFFIX).unwrap_or(name);
    Ok(name.replace('_', "-").replace('Å', "A").to_lowercase())
}

/// 单位 → (测量类型 URN, SenML 单位, 换算系数)
fn unit_mapping(unit: &str) -> Result<(&'static str, &'static str, f64), SchneiderError> {
    match unit {
        "°C" => Ok((TEMPERATURE_URN, UNIT_CELSIUS, 1.0)),
        // Wh → J
        "Wh" => Ok((ENERGY_URN, UNIT_JOULE, 3600.0)),
        "W" => Ok((POWER_URN, UNIT_WATT, 1.0)),
        other => Err(SchneiderError::UnsupportedUnit(other.to_string())),
    }
}

pub fn build_pack(data: &SchneiderData, base_time: f64) -> Result<SenmlPack, SchneiderError> {
    let name = trim_name(&data.name)?;
    let value = data
        .value
        .trim()
        .parse::<f64>()
        .map_err(|_| SchneiderError::InvalidValue(data.value.clone()))?;
    let (base_name, unit, factor) = unit_mapping(&data.unit)?;
    Ok(SenmlPack::new(&name, base_name, base_time).with_value(SENSOR_VALUE, unit, value * factor))
}

pub async fn receive_schneider(
    State(state): State<AppState>,
    Extension(ids): Extension<RequestIds>,
    body: Bytes,
) -> Response {
    match forward_all(&state, &body).await {
        Ok(count) => {
            debug!(
                target: "iot.schneider",
                request_id = %ids.request_id,
                packs = count,
                "schneider batch forwarded"
            );
            StatusCode::OK.into_response()
        }
        Err(err) => {
            error!(
                target: "iot.schneider",
                request_id = %ids.request_id,
                error = %err,
                "failed to handle message"
            );
            internal_text_error(err.to_string())
        }
    }
}

async fn forward_all(state: &AppState, body: &[u8]) -> Result<usize, SchneiderError> {
    let objects: Vec<SchneiderData> =
        serde_json::from_slice(body).map_err(|err| SchneiderError::Body(err.to_string()))?;
    let base_time = now_epoch_secs();
    for object in &objects {
        let pack = build_pack(object, base_time)?;
        state.forwarder.forward(&pack).await?;
    }
    Ok(objects.len())
}

fn now_epoch_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_name_strips_prefix_and_suffix() {
        let name = trim_name(
            "/Enterprise Server Mitthem/IoT-gränssnitt/MQTT-klient/!UC_Framåt/Västra_Å_1/Value",
        )
        .expect("trim");
        assert_eq!(name, "västra-a-1");
    }

    #[test]
    fn trim_name_keeps_unprefixed_names() {
        assert_eq!(trim_name("Pump_Å2").expect("trim"), "pump-a2");
    }

    #[test]
    fn trim_name_rejects_empty() {
        assert!(matches!(trim_name(""), Err(SchneiderError::EmptyName)));
    }

    #[test]
    fn energy_is_converted_to_joule() {
        let data = SchneiderData {
            name: "meter_1".to_string(),
            value: "2.5".to_string(),
            unit: "Wh".to_string(),
        };

        let pack = build_pack(&data, 1_650_000_000.0).expect("pack");
        let records = pack.records();

        assert_eq!(records[0].base_name.as_deref(), Some("meter-1/3331/"));
        assert_eq!(records[0].string_value.as_deref(), Some(ENERGY_URN));
        assert_eq!(records[1].unit.as_deref(), Some("J"));
        assert_eq!(records[1].value, Some(9000.0));
    }

    #[test]
    fn temperature_and_power_keep_value() {
        let temperature = SchneiderData {
            name: "room".to_string(),
            value: "21.5".to_string(),
            unit: "°C".to_string(),
        };
        let pack = build_pack(&temperature, 0.0).expect("pack");
        assert_eq!(pack.records()[1].unit.as_deref(), Some("Cel"));
        assert_eq!(pack.records()[1].value, Some(21.5));

        let power = SchneiderData {
            unit: "W".to_string(),
            ..temperature
        };
        let pack = build_pack(&power, 0.0).expect("pack");
        assert_eq!(pack.records()[0].string_value.as_deref(), Some(POWER_URN));
        assert_eq!(pack.records()[1].unit.as_deref(), Some("W"));
    }

    #[test]
    fn invalid_value_and_unit_are_rejected() {
        let data = SchneiderData {
            name: "room".to_string(),
            value: "n/a".to_string(),
            unit: "°C".to_string(),
        };
        assert!(matches!(
            build_pack(&data, 0.0),
            Err(SchneiderError::InvalidValue(_))
        ));

        let data = SchneiderData {
            value: "1".to_string(),
            unit: "kPa".to_string(),
            ..data
        };
        assert!(matches!(
            build_pack(&data, 0.0),
            Err(SchneiderError::UnsupportedUnit(unit)) if unit == "kPa"
        ));
    }
}
