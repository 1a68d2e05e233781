//! 上行链路装配模块
//!
//! 将解码器注册表、消息转换器和事件发送器串成一条处理链：
//! 上行报文按设备类型选择解码器，解码出的每条读数转换为内部消息格式后
//! 作为命令发送到核心队列。HTTP 接入与 MQTT 接入共用同一条链路。

use async_trait::async_trait;
use domain::RawUplink;
use iot_config::AppConfig;
use iot_conversion::MessageConverter;
use iot_decoder::{DecodeError, DecoderRegistry, Emit};
use iot_events::{CommandMessage, EventSender};
use iot_ingest::{IngestError, MqttSource, MqttSourceConfig, NoopSource, Source, UplinkHandler};
use iot_telemetry::{
    record_conversion_failure, record_decode_failure, record_reading_emitted,
    record_uplink_received,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// 上行处理链路
pub struct UplinkPipeline {
    /// 设备类型 → 解码器
    registry: DecoderRegistry,
    /// 读数 → 内部消息格式
    converter: MessageConverter,
    /// 内部消息的下发通道
    sender: Arc<dyn EventSender>,
}

impl UplinkPipeline {
    pub fn new(
        registry: DecoderRegistry,
        converter: MessageConverter,
        sender: Arc<dyn EventSender>,
    ) -> Self {
        Self {
            registry,
            converter,
            sender,
        }
    }

    /// 处理一条上行报文，返回成功发送的读数条数。
    ///
    /// 解码或发送失败时立即返回错误；失败前已发送的读数不会撤回。
    pub async fn process(
        &self,
        ctx: &CancellationToken,
        uplink: RawUplink,
    ) -> Result<usize, DecodeError> {
        record_uplink_received();
        info!(
            target: "iot.ingest",
            device_type = %uplink.device_type,
            payload_size = uplink.payload.len(),
            received_at = %uplink.received_at,
            "uplink_received"
        );

        let emit = ForwardingEmit {
            converter: self.converter.clone(),
            sender: self.sender.clone(),
            sent: AtomicUsize::new(0),
        };
        let result = self.registry.decode(ctx, &uplink, &emit).await;
        let sent = emit.sent.load(Ordering::Relaxed);
        match result {
            Ok(()) => {
                info!(
                    target: "iot.ingest",
                    device_type = %uplink.device_type,
                    readings = sent,
                    "uplink_processed"
                );
                Ok(sent)
            }
            Err(err) => {
                if !matches!(err, DecodeError::Emit(_) | DecodeError::Cancelled) {
                    record_decode_failure();
                }
                warn!(
                    target: "iot.ingest",
                    device_type = %uplink.device_type,
                    readings = sent,
                    error = %err,
                    "uplink_failed"
                );
                Err(err)
            }
        }
    }
}

#[async_trait]
impl UplinkHandler for UplinkPipeline {
    async fn handle(&self, ctx: &CancellationToken, uplink: RawUplink) -> Result<(), IngestError> {
        self.process(ctx, uplink)
            .await
            .map(|_| ())
            .map_err(|err| IngestError::Handler(err.to_string()))
    }
}

/// 读数回调：转换后立即发送，不做缓冲。
struct ForwardingEmit {
    converter: MessageConverter,
    sender: Arc<dyn EventSender>,
    sent: AtomicUsize,
}

#[async_trait]
impl Emit for ForwardingEmit {
    async fn emit(&self, ctx: &CancellationToken, record: Vec<u8>) -> Result<(), DecodeError> {
        record_reading_emitted();
        let internal_id = device_identity(&record).ok_or_else(|| {
            record_conversion_failure();
            DecodeError::Emit("reading has no device identity".to_string())
        })?;
        let message = self
            .converter
            .convert_payload(&internal_id, &record)
            .map_err(|err| {
                record_conversion_failure();
                DecodeError::Emit(err.to_string())
            })?;
        let command =
            CommandMessage::json(&message).map_err(|err| DecodeError::Emit(err.to_string()))?;
        self.sender
            .send(ctx, command)
            .await
            .map_err(|err| DecodeError::Emit(err.to_string()))?;
        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

// 解码器输出的读数记录统一带 devEui
fn device_identity(record: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(record).ok()?;
    value
        .get("devEui")
        .and_then(serde_json::Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// 启动 MQTT 上行接入任务
///
/// 未启用接入时使用空操作源，任务立即结束。
pub fn spawn_ingest(
    config: &AppConfig,
    pipeline: Arc<UplinkPipeline>,
    ctx: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let source: Arc<dyn Source> = if config.ingest_enabled {
        let mqtt_config = MqttSourceConfig {
            host: config.mqtt_host.clone(),
            port: config.mqtt_port,
            username: config.mqtt_username.clone(),
            password: config.mqtt_password.clone(),
            topic_prefix: config.mqtt_uplink_topic_prefix.clone(),
        };
        info!(
            target: "iot.ingest",
            "ingest source: mqtt {}:{} prefix={}",
            mqtt_config.host, mqtt_config.port, mqtt_config.topic_prefix
        );
        Arc::new(MqttSource::new(mqtt_config))
    } else {
        info!(target: "iot.ingest", "ingest source: noop (IOT_AGENT_INGEST=off)");
        Arc::new(NoopSource)
    };

    tokio::spawn(async move {
        if let Err(err) = source.run(ctx, pipeline).await {
            warn!(target: "iot.ingest", "ingest stopped: {}", err);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingSender;
    use iot_events::EventError;

    fn pipeline(sender: Arc<RecordingSender>) -> UplinkPipeline {
        UplinkPipeline::new(
            DecoderRegistry::new(),
            MessageConverter::temperature(),
            sender,
        )
    }

    fn senlabt_uplink(payloads: &[&str]) -> RawUplink {
        let envelopes = payloads
            .iter()
            .enumerate()
            .map(|(index, payload)| {
                format!(
                    r#"{{"devEui":"dev-{index}","payload":"{payload}","timestamp":"2022-04-12T05:08:50Z"}}"#
                )
            })
            .collect::<Vec<_>>()
            .join(",");
        RawUplink::new("senlabt", format!("[{envelopes}]").into_bytes(), "t0")
    }

    #[tokio::test]
    async fn readings_are_converted_and_sent() {
        let sender = Arc::new(RecordingSender::started());
        let pipeline = pipeline(sender.clone());

        let sent = pipeline
            .process(&CancellationToken::new(), senlabt_uplink(&["01fe0020", "01fe0150"]))
            .await
            .expect("process");

        assert_eq!(sent, 2);
        let commands = sender.commands();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0]["internalID"], "dev-0");
        assert_eq!(commands[0]["type"], "urn:oma:lwm2m:ext:3303");
        assert_eq!(commands[0]["value"]["temperature"], 2.0);
        assert_eq!(commands[1]["internalID"], "dev-1");
        assert_eq!(commands[1]["value"]["temperature"], 21.0);
    }

    #[tokio::test]
    async fn sender_failure_aborts_uplink() {
        let sender = Arc::new(RecordingSender::failing(EventError::NotStarted));
        let pipeline = pipeline(sender.clone());

        let err = pipeline
            .process(&CancellationToken::new(), senlabt_uplink(&["01fe0020", "01fe0150"]))
            .await
            .expect_err("send failure");

        assert_eq!(err, DecodeError::Emit("sender not started".to_string()));
        // 第一条失败后不再尝试后续读数
        assert_eq!(sender.attempts(), 1);
    }

    #[tokio::test]
    async fn pass_through_without_identity_is_rejected() {
        let sender = Arc::new(RecordingSender::started());
        let pipeline = pipeline(sender.clone());
        let uplink = RawUplink::new("unknown", br#"{"temperature":2.0}"#.to_vec(), "t0");

        let err = pipeline
            .process(&CancellationToken::new(), uplink)
            .await
            .expect_err("no identity");

        assert!(matches!(err, DecodeError::Emit(_)));
        assert!(sender.commands().is_empty());
    }

    #[tokio::test]
    async fn pass_through_with_identity_is_sent() {
        let sender = Arc::new(RecordingSender::started());
        let pipeline = pipeline(sender.clone());
        let uplink = RawUplink::new(
            "unknown",
            br#"{"devEui":"dev-9","temperature":-3.5}"#.to_vec(),
            "t0",
        );

        let sent = pipeline
            .process(&CancellationToken::new(), uplink)
            .await
            .expect("process");

        assert_eq!(sent, 1);
        assert_eq!(sender.commands()[0]["value"]["temperature"], -3.5);
    }

    #[tokio::test]
    async fn decode_failure_sends_nothing() {
        let sender = Arc::new(RecordingSender::started());
        let pipeline = pipeline(sender.clone());

        let err = pipeline
            .process(&CancellationToken::new(), senlabt_uplink(&["0c000000"]))
            .await
            .expect_err("unsupported");

        assert_eq!(err, DecodeError::UnsupportedFrame(12));
        assert_eq!(sender.attempts(), 0);
    }

    #[tokio::test]
    async fn handler_maps_errors() {
        let sender = Arc::new(RecordingSender::started());
        let pipeline = pipeline(sender);

        let err = pipeline
            .handle(&CancellationToken::new(), senlabt_uplink(&["010000"]))
            .await
            .expect_err("short");

        assert!(matches!(err, IngestError::Handler(message) if message.starts_with("short frame")));
    }
}
