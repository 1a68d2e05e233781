use async_trait::async_trait;
use domain::RawUplink;
use iot_ingest::{IngestError, MqttSource, MqttSourceConfig, Source, UplinkHandler, now_epoch_ms};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct NoopHandler;

#[async_trait]
impl UplinkHandler for NoopHandler {
    async fn handle(
        &self,
        _ctx: &CancellationToken,
        _uplink: RawUplink,
    ) -> Result<(), IngestError> {
        Ok(())
    }
}

fn unreachable_source() -> MqttSource {
    MqttSource::new(MqttSourceConfig {
        // 端口 1 上没有 broker，连接立即被拒绝
        host: "127.0.0.1".to_string(),
        port: 1,
        username: None,
        password: None,
        topic_prefix: "iot-agent/uplinks".to_string(),
    })
}

#[tokio::test]
async fn broker_errors_do_not_end_ingestion() {
    let ctx = CancellationToken::new();
    let source = unreachable_source();
    let run_ctx = ctx.clone();
    let task = tokio::spawn(async move { source.run(run_ctx, Arc::new(NoopHandler)).await });

    // 多次连接失败后仍在运行
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(!task.is_finished());

    ctx.cancel();
    let result = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("stops after cancel")
        .expect("join");
    assert!(result.is_ok());
}

#[tokio::test]
async fn cancelled_source_returns_immediately() {
    let ctx = CancellationToken::new();
    ctx.cancel();

    let result = tokio::time::timeout(
        Duration::from_secs(1),
        unreachable_source().run(ctx, Arc::new(NoopHandler)),
    )
    .await
    .expect("prompt return");

    assert!(result.is_ok());
}

#[test]
fn receive_time_is_epoch_millis() {
    // 2020-01-01 之后，且为毫秒量级
    let now = now_epoch_ms();
    assert!(now > 1_577_836_800_000);
    assert!(now < 100_000_000_000_000);
}
