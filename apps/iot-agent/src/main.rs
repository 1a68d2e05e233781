//! IoT agent：设备上行报文解码、规范化并送往 iot-core，
//! 同时把 Schneider 楼宇数据转为 SenML 转发。

mod forwarder;
mod handlers;
mod ingest;
mod middleware;
mod routes;
#[cfg(test)]
mod test_support;
mod utils;

use forwarder::{HttpForwarder, SenmlForwarder};
use ingest::{UplinkPipeline, spawn_ingest};
use iot_config::AppConfig;
use iot_conversion::MessageConverter;
use iot_decoder::DecoderRegistry;
use iot_events::{EventSender, MessagingEventSender, MqttTransportConfig, MqttTransportFactory};
use iot_telemetry::{init_tracing, metrics};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<UplinkPipeline>,
    pub sender: Arc<dyn EventSender>,
    pub forwarder: Arc<dyn SenmlForwarder>,
    /// 根取消令牌，请求处理使用其子令牌
    pub shutdown: CancellationToken,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    let shutdown = CancellationToken::new();

    // 事件发送器：命令/事件经 MQTT 下发
    let factory = Arc::new(MqttTransportFactory::new(MqttTransportConfig {
        host: config.mqtt_host.clone(),
        port: config.mqtt_port,
        username: config.mqtt_username.clone(),
        password: config.mqtt_password.clone(),
        topic_prefix: config.mqtt_topic_prefix.clone(),
        qos: config.mqtt_qos,
    }));
    let sender: Arc<dyn EventSender> = Arc::new(MessagingEventSender::new(factory));
    sender.start(&shutdown).await?;

    let pipeline = Arc::new(UplinkPipeline::new(
        DecoderRegistry::new(),
        MessageConverter::new(config.measurement_type.clone()),
        sender.clone(),
    ));
    // MQTT 上行接入（IOT_AGENT_INGEST=on 时启用）
    let ingest = spawn_ingest(&config, pipeline.clone(), shutdown.child_token());

    let forwarder: Arc<dyn SenmlForwarder> =
        Arc::new(HttpForwarder::new(&config.forwarding_endpoint));
    let state = AppState {
        pipeline,
        sender: sender.clone(),
        forwarder,
        shutdown: shutdown.clone(),
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(target: "iot.api", "listening on {}", config.http_addr);
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(target: "iot.api", "ctrl_c listener failed: {}", err);
            }
            info!(target: "iot.api", "shutdown requested");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Err(err) = ingest.await {
        warn!(target: "iot.ingest", "ingest task failed: {}", err);
    }
    sender.stop().await?;

    let snapshot = metrics().snapshot();
    info!(
        target: "iot.api",
        uplinks_received = snapshot.uplinks_received,
        readings_emitted = snapshot.readings_emitted,
        decode_failures = snapshot.decode_failures,
        messages_sent = snapshot.messages_sent,
        send_failures = snapshot.send_failures,
        packs_forwarded = snapshot.packs_forwarded,
        forward_failures = snapshot.forward_failures,
        "iot agent stopped"
    );
    Ok(())
}
