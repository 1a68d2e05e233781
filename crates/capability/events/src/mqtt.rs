//! MQTT 传输层实现
//!
//! - 命令：`{prefix}/commands/{destination}`
//! - 事件：`{prefix}/topics/{topic}`

use crate::error::EventError;
use crate::message::{CommandMessage, TopicMessage};
use crate::{MessageTransport, TransportFactory};
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Outgoing, QoS};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// `close()` 等待 eventloop 写出 DISCONNECT 的上限
const CLOSE_TIMEOUT: Duration = Duration::from_millis(500);

/// MQTT 传输层配置。
#[derive(Debug, Clone)]
pub struct MqttTransportConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub topic_prefix: String,
    pub qos: u8,
}

pub struct MqttTransport {
    client: AsyncClient,
    topic_prefix: String,
    qos: QoS,
    eventloop: Mutex<Option<JoinHandle<()>>>,
}

impl MqttTransport {
    /// 创建客户端并在后台驱动 eventloop（断线后由 rumqttc 自动重连）。
    pub fn connect(config: MqttTransportConfig) -> Self {
        let client_id = format!("iot-agent-events-{}", uuid::Uuid::new_v4());
        let mut options = MqttOptions::new(client_id, config.host, config.port);
        options.set_keep_alive(Duration::from_secs(30));
        if let (Some(username), Some(password)) = (config.username, config.password) {
            options.set_credentials(username, password);
        }
        let (client, mut eventloop) = AsyncClient::new(options, 10);
        let handle = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                        debug!(target: "iot.events", "mqtt disconnect sent");
                        break;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(target: "iot.events", "mqtt eventloop error: {}", err);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });
        Self {
            client,
            topic_prefix: config.topic_prefix,
            qos: qos_from_u8(config.qos),
            eventloop: Mutex::new(Some(handle)),
        }
    }

    async fn publish(&self, topic: String, body: Vec<u8>) -> Result<(), EventError> {
        debug!(target: "iot.events", topic = %topic, payload_size = body.len(), "mqtt_publish");
        self.client
            .publish(topic, self.qos, false, body)
            .await
            .map_err(|err| EventError::Transport(err.to_string()))
    }
}

#[async_trait]
impl MessageTransport for MqttTransport {
    async fn send_command_to(
        &self,
        _ctx: &CancellationToken,
        message: CommandMessage,
        destination: &str,
    ) -> Result<(), EventError> {
        let topic = topic_for(&self.topic_prefix, "commands", destination);
        self.publish(topic, message.into_body()).await
    }

    async fn publish_on_topic(
        &self,
        _ctx: &CancellationToken,
        message: TopicMessage,
    ) -> Result<(), EventError> {
        let topic = topic_for(&self.topic_prefix, "topics", message.topic_name());
        self.publish(topic, message.into_body()).await
    }

    async fn close(&self) -> Result<(), EventError> {
        let result = self
            .client
            .disconnect()
            .await
            .map_err(|err| EventError::Transport(err.to_string()));
        let handle = self.eventloop.lock().ok().and_then(|mut guard| guard.take());
        if let Some(mut handle) = handle {
            // 未连接时 DISCONNECT 永远写不出去，超时后直接终止
            if tokio::time::timeout(CLOSE_TIMEOUT, &mut handle).await.is_err() {
                debug!(target: "iot.events", "mqtt eventloop did not finish, aborting");
                handle.abort();
            }
        }
        result
    }
}

/// `start()` 时按配置建立 MQTT 连接。
#[derive(Debug, Clone)]
pub struct MqttTransportFactory {
    config: MqttTransportConfig,
}

impl MqttTransportFactory {
    pub fn new(config: MqttTransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TransportFactory for MqttTransportFactory {
    async fn connect(&self) -> Result<Arc<dyn MessageTransport>, EventError> {
        if self.config.host.is_empty() {
            return Err(EventError::Transport("mqtt host is empty".to_string()));
        }
        Ok(Arc::new(MqttTransport::connect(self.config.clone())))
    }
}

fn topic_for(prefix: &str, kind: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let name = name.trim_matches('/');
    if prefix.is_empty() {
        format!("{}/{}", kind, name)
    } else {
        format!("{}/{}/{}", prefix, kind, name)
    }
}

fn qos_from_u8(value: u8) -> QoS {
    match value {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtLeastOnce,
    }
}
