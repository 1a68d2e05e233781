use async_trait::async_trait;
use domain::RawUplink;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// 接入错误。
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("handler error: {0}")]
    Handler(String),
    #[error("source error: {0}")]
    Source(String),
}

/// 上行报文处理器。
#[async_trait]
pub trait UplinkHandler: Send + Sync {
    async fn handle(&self, ctx: &CancellationToken, uplink: RawUplink) -> Result<(), IngestError>;
}

/// 接入源抽象，运行到 `ctx` 被取消为止。
#[async_trait]
pub trait Source: Send + Sync {
    async fn run(
        &self,
        ctx: CancellationToken,
        handler: Arc<dyn UplinkHandler>,
    ) -> Result<(), IngestError>;
}

/// 占位源（未启用 MQTT 接入时使用）。
#[derive(Debug, Default)]
pub struct NoopSource;

#[async_trait]
impl Source for NoopSource {
    async fn run(
        &self,
        _ctx: CancellationToken,
        _handler: Arc<dyn UplinkHandler>,
    ) -> Result<(), IngestError> {
        Ok(())
    }
}

/// MQTT 接入源配置。
#[derive(Debug, Clone)]
pub struct MqttSourceConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// 订阅 `{topic_prefix}/#`，主题格式 `{topic_prefix}/{device_type}/{device...}`
    pub topic_prefix: String,
}

/// MQTT 接入源。
#[derive(Debug, Clone)]
pub struct MqttSource {
    config: MqttSourceConfig,
}

impl MqttSource {
    pub fn new(config: MqttSourceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MqttSourceConfig {
        &self.config
    }
}

#[async_trait]
impl Source for MqttSource {
    async fn run(
        &self,
        ctx: CancellationToken,
        handler: Arc<dyn UplinkHandler>,
    ) -> Result<(), IngestError> {
        let client_id = format!("iot-agent-ingest-{}", uuid::Uuid::new_v4());
        let mut options =
            rumqttc::MqttOptions::new(client_id, self.config.host.clone(), self.config.port);
        options.set_keep_alive(Duration::from_secs(30));
        if let (Some(username), Some(password)) =
            (self.config.username.as_ref(), self.config.password.as_ref())
        {
            options.set_credentials(username, password);
        }

        let (client, mut eventloop) = rumqttc::AsyncClient::new(options, 10);
        let topic = format!("{}/#", self.config.topic_prefix.trim_end_matches('/'));

        loop {
            let event = tokio::select! {
                biased;
                _ = ctx.cancelled() => {
                    info!(target: "iot.ingest", "mqtt source cancelled");
                    if let Err(err) = client.try_disconnect() {
                        debug!(target: "iot.ingest", "mqtt disconnect failed: {}", err);
                    }
                    return Ok(());
                }
                event = eventloop.poll() => event,
            };
            match event {
                // 每次（重新）连上 broker 都要重新订阅
                Ok(rumqttc::Event::Incoming(rumqttc::Packet::ConnAck(_))) => {
                    info!(target: "iot.ingest", "mqtt source connected, subscribing {}", topic);
                    if let Err(err) =
                        client.try_subscribe(topic.clone(), rumqttc::QoS::AtLeastOnce)
                    {
                        warn!(target: "iot.ingest", "mqtt subscribe failed: {}", err);
                    }
                }
                Ok(rumqttc::Event::Incoming(rumqttc::Packet::Publish(publish))) => {
                    let Some(device_type) =
                        extract_device_type(&self.config.topic_prefix, &publish.topic)
                    else {
                        warn!(target: "iot.ingest", "mqtt topic skipped: {}", publish.topic);
                        continue;
                    };
                    let uplink = RawUplink::new(
                        device_type,
                        publish.payload.to_vec(),
                        now_epoch_ms().to_string(),
                    );
                    if let Err(err) = handler.handle(&ctx, uplink).await {
                        warn!(target: "iot.ingest", "uplink handler failed: {}", err);
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    // 断线后由 rumqttc 在下一次 poll 时重连
                    warn!(target: "iot.ingest", "mqtt source error: {}", err);
                    tokio::select! {
                        _ = ctx.cancelled() => {}
                        _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                    }
                }
            }
        }
    }
}

/// `{prefix}/{device_type}/{device...}` → device_type
pub fn extract_device_type(prefix: &str, topic: &str) -> Option<String> {
    let prefix = prefix.trim_matches('/');
    let topic = topic.trim_matches('/');
    let rest = if prefix.is_empty() {
        topic
    } else {
        topic.strip_prefix(prefix)?
    };
    // 前缀必须在分段边界上结束
    let rest = if prefix.is_empty() {
        rest
    } else {
        rest.strip_prefix('/')?
    };
    let mut parts = rest.split('/');
    let device_type = parts.next().filter(|part| !part.is_empty())?;
    let device = parts.collect::<Vec<_>>().join("/");
    if device.is_empty() {
        return None;
    }
    Some(device_type.to_string())
}

/// 当前 Unix 毫秒时间戳，作为上行报文的接收时间。
pub fn now_epoch_ms() -> i64 {
    let now = std::time::SystemTime::now();
    let duration = now
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    duration.as_millis() as i64
}
