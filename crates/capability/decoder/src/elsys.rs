//! Elsys 传感器解码器
//!
//! Elsys 的二进制帧由网络服务器侧的 codec 解好，放在上行消息的 `object` 字段里，
//! 这里只做字段抽取与规范化。

use crate::error::DecodeError;
use crate::{Emit, MessageDecoder, emit_checked};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Uplink {
    #[serde(rename = "devEUI")]
    dev_eui: String,
    #[serde(default)]
    device_name: String,
    #[serde(default)]
    rx_info: Vec<RxInfo>,
    object: Option<ElsysMeasurements>,
}

#[derive(Debug, Deserialize)]
struct RxInfo {
    time: Option<String>,
}

/// codec 解出的测量字段，缺失即为 None
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElsysMeasurements {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub co2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motion: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vdd: Option<f64>,
}

/// 输出的读数记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElsysRecord {
    pub dev_eui: String,
    pub device_name: String,
    /// 第一个网关的接收时间
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub measurements: ElsysMeasurements,
}

#[derive(Debug, Default)]
pub struct ElsysDecoder;

#[async_trait]
impl MessageDecoder for ElsysDecoder {
    async fn decode(
        &self,
        ctx: &CancellationToken,
        payload: &[u8],
        emit: &dyn Emit,
    ) -> Result<(), DecodeError> {
        let uplink: Uplink = serde_json::from_slice(payload)
            .map_err(|err| DecodeError::MalformedEnvelope(err.to_string()))?;
        let measurements = uplink
            .object
            .ok_or_else(|| DecodeError::MalformedEnvelope("missing object".to_string()))?;

        let record = ElsysRecord {
            dev_eui: uplink.dev_eui,
            device_name: uplink.device_name,
            timestamp: uplink.rx_info.into_iter().find_map(|rx| rx.time),
            measurements,
        };
        let bytes =
            serde_json::to_vec(&record).map_err(|err| DecodeError::Encode(err.to_string()))?;
        emit_checked(ctx, emit, bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct LastRecord {
        record: Mutex<Option<ElsysRecord>>,
    }

    #[async_trait]
    impl Emit for LastRecord {
        async fn emit(&self, _ctx: &CancellationToken, record: Vec<u8>) -> Result<(), DecodeError> {
            let record: ElsysRecord = serde_json::from_slice(&record).expect("record");
            *self.record.lock().expect("lock") = Some(record);
            Ok(())
        }
    }

    const ELSYS_TEMP: &str = r#"{
        "applicationID": "8",
        "applicationName": "Water-Temperature",
        "deviceName": "sk-elt-temp-16",
        "deviceProfileName": "Elsys_Codec",
        "devEUI": "a81758fffe04d83f",
        "rxInfo": [{
            "gatewayID": "fcc23dfffe2ee936",
            "name": "SN-LGW-047",
            "time": "2022-03-28T12:40:40.653515637Z",
            "rssi": -105,
            "loRaSNR": 8.5
        }],
        "txInfo": { "frequency": 867700000, "dr": 5 },
        "fCnt": 10301,
        "fPort": 5,
        "data": "Bw2KDADB",
        "object": { "externalTemperature": 19.3, "vdd": 3466 }
    }"#;

    const ELSYS_CO2: &str = r#"{
        "deviceName": "mcg-ers-co2-01",
        "deviceProfileName": "ELSYS",
        "devEUI": "a81758fffe05e6fb",
        "data": "AQDoAgwEAFoFAgYBqwcONA==",
        "object": {
            "co2": 427,
            "humidity": 12,
            "light": 90,
            "motion": 2,
            "temperature": 23.2,
            "vdd": 3636
        }
    }"#;

    #[tokio::test]
    async fn decodes_external_temperature() {
        let emit = LastRecord::default();
        ElsysDecoder
            .decode(&CancellationToken::new(), ELSYS_TEMP.as_bytes(), &emit)
            .await
            .expect("decode");

        let record = emit.record.lock().expect("lock").clone().expect("record");
        assert_eq!(record.dev_eui, "a81758fffe04d83f");
        assert_eq!(record.device_name, "sk-elt-temp-16");
        assert_eq!(
            record.timestamp.as_deref(),
            Some("2022-03-28T12:40:40.653515637Z")
        );
        assert_eq!(record.measurements.external_temperature, Some(19.3));
        assert_eq!(record.measurements.vdd, Some(3466.0));
        assert!(record.measurements.temperature.is_none());
    }

    #[tokio::test]
    async fn decodes_co2_without_rx_info() {
        let emit = LastRecord::default();
        ElsysDecoder
            .decode(&CancellationToken::new(), ELSYS_CO2.as_bytes(), &emit)
            .await
            .expect("decode");

        let record = emit.record.lock().expect("lock").clone().expect("record");
        assert_eq!(record.dev_eui, "a81758fffe05e6fb");
        assert!(record.timestamp.is_none());
        assert_eq!(record.measurements.co2, Some(427.0));
        assert_eq!(record.measurements.temperature, Some(23.2));
        assert_eq!(record.measurements.humidity, Some(12.0));
    }

    #[tokio::test]
    async fn missing_object_is_malformed() {
        let emit = LastRecord::default();
        let err = ElsysDecoder
            .decode(
                &CancellationToken::new(),
                br#"{"devEUI": "a81758fffe05e6fb"}"#,
                &emit,
            )
            .await
            .expect_err("missing object");
        assert_eq!(err, DecodeError::MalformedEnvelope("missing object".to_string()));
        assert!(emit.record.lock().expect("lock").is_none());
    }
}
