//! 事件发送能力：把规范化后的消息送到命令队列或发布到主题。
//!
//! 发送器生命周期只前进不回退：
//!
//! ```text
//! NotStarted ──start()──► Started ──stop()──► Stopped
//!      └───────────────stop()──────────────────┘
//! ```
//!
//! 只有 Started 状态下 `send` / `publish` 才会触达传输层。

mod error;
mod message;
mod mqtt;

use async_trait::async_trait;
use iot_telemetry::{record_message_sent, record_send_failure};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub use error::EventError;
pub use message::{CommandMessage, TopicMessage};
pub use mqtt::{MqttTransport, MqttTransportConfig, MqttTransportFactory};

/// 命令统一投递到的队列。
pub const CORE_QUEUE: &str = "iot-core";

/// 消息总线传输层抽象。
///
/// 并发 `send_command_to` / `publish_on_topic` 的安全性由实现保证。
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send_command_to(
        &self,
        ctx: &CancellationToken,
        message: CommandMessage,
        destination: &str,
    ) -> Result<(), EventError>;

    async fn publish_on_topic(
        &self,
        ctx: &CancellationToken,
        message: TopicMessage,
    ) -> Result<(), EventError>;

    /// 释放底层连接。
    async fn close(&self) -> Result<(), EventError>;
}

/// 传输层工厂，`start()` 时调用一次。
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn MessageTransport>, EventError>;
}

/// 发送器状态（对外只读视图）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderStatus {
    NotStarted,
    Started,
    Stopped,
}

impl fmt::Display for SenderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not_started",
            Self::Started => "started",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// 事件发送器抽象。
#[async_trait]
pub trait EventSender: Send + Sync {
    async fn start(&self, ctx: &CancellationToken) -> Result<(), EventError>;
    async fn send(&self, ctx: &CancellationToken, message: CommandMessage)
    -> Result<(), EventError>;
    async fn publish(&self, ctx: &CancellationToken, message: TopicMessage)
    -> Result<(), EventError>;
    async fn stop(&self) -> Result<(), EventError>;
    async fn status(&self) -> SenderStatus;
}

enum SenderState {
    NotStarted,
    Started(Arc<dyn MessageTransport>),
    Stopped,
}

impl SenderState {
    fn status(&self) -> SenderStatus {
        match self {
            Self::NotStarted => SenderStatus::NotStarted,
            Self::Started(_) => SenderStatus::Started,
            Self::Stopped => SenderStatus::Stopped,
        }
    }
}

/// 基于传输层工厂的事件发送器。
///
/// `send` / `publish` 在整个传输调用期间持有读锁，`stop` 持有写锁，
/// 因此 `stop` 不会在发送进行中关闭传输层。`start` 建连时不持锁，
/// 只在状态切换时短暂持有写锁。
pub struct MessagingEventSender {
    factory: Arc<dyn TransportFactory>,
    state: RwLock<SenderState>,
}

impl MessagingEventSender {
    pub fn new(factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            factory,
            state: RwLock::new(SenderState::NotStarted),
        }
    }
}

#[async_trait]
impl EventSender for MessagingEventSender {
    async fn start(&self, ctx: &CancellationToken) -> Result<(), EventError> {
        {
            let state = self.state.read().await;
            if !matches!(*state, SenderState::NotStarted) {
                return Err(EventError::InvalidState(state.status()));
            }
        }

        // 失败时保持 NotStarted，错误原样返回
        let transport = cancellable(ctx, self.factory.connect()).await?;

        let mut state = self.state.write().await;
        if !matches!(*state, SenderState::NotStarted) {
            // 建连期间被 stop() 或另一个 start() 抢先，丢弃新连接
            let err = EventError::InvalidState(state.status());
            drop(state);
            if let Err(close_err) = transport.close().await {
                warn!(
                    target: "iot.events",
                    error = %close_err,
                    "discarded transport close failed"
                );
            }
            return Err(err);
        }
        *state = SenderState::Started(transport);
        info!(target: "iot.events", "event sender started");
        Ok(())
    }

    async fn send(
        &self,
        ctx: &CancellationToken,
        message: CommandMessage,
    ) -> Result<(), EventError> {
        let state = self.state.read().await;
        let SenderState::Started(transport) = &*state else {
            let err = EventError::NotStarted;
            error!(target: "iot.events", error = %err, status = %state.status(), "send failed");
            return Err(err);
        };

        info!(
            target: "iot.events",
            destination = CORE_QUEUE,
            content_type = message.content_type(),
            payload_size = message.body().len(),
            "sending command to iot-core queue"
        );
        let result = cancellable(ctx, transport.send_command_to(ctx, message, CORE_QUEUE)).await;
        record_outcome(&result);
        result
    }

    async fn publish(
        &self,
        ctx: &CancellationToken,
        message: TopicMessage,
    ) -> Result<(), EventError> {
        let state = self.state.read().await;
        let SenderState::Started(transport) = &*state else {
            let err = EventError::NotStarted;
            error!(target: "iot.events", error = %err, status = %state.status(), "publish failed");
            return Err(err);
        };

        info!(
            target: "iot.events",
            topic = message.topic_name(),
            payload_size = message.body().len(),
            "publishing event"
        );
        let result = cancellable(ctx, transport.publish_on_topic(ctx, message)).await;
        record_outcome(&result);
        result
    }

    async fn stop(&self) -> Result<(), EventError> {
        let mut state = self.state.write().await;
        let previous = std::mem::replace(&mut *state, SenderState::Stopped);
        match previous {
            SenderState::Started(transport) => {
                info!(target: "iot.events", "event sender stopping");
                transport.close().await
            }
            SenderState::NotStarted | SenderState::Stopped => Ok(()),
        }
    }

    async fn status(&self) -> SenderStatus {
        self.state.read().await.status()
    }
}

async fn cancellable<T, F>(ctx: &CancellationToken, fut: F) -> Result<T, EventError>
where
    F: Future<Output = Result<T, EventError>>,
{
    tokio::select! {
        biased;
        _ = ctx.cancelled() => Err(EventError::Cancelled),
        result = fut => result,
    }
}

fn record_outcome(result: &Result<(), EventError>) {
    match result {
        Ok(()) => record_message_sent(),
        Err(_) => record_send_failure(),
    }
}
