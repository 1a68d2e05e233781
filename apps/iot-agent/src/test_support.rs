//! 测试用的发送器与转发器替身

use crate::forwarder::{ForwardError, SenmlForwarder};
use async_trait::async_trait;
use iot_conversion::SenmlPack;
use iot_events::{CommandMessage, EventError, EventSender, SenderStatus, TopicMessage};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

/// 记录每条命令，可配置为固定失败。
pub struct RecordingSender {
    commands: Mutex<Vec<serde_json::Value>>,
    attempts: AtomicUsize,
    fail_with: Option<EventError>,
}

impl RecordingSender {
    pub fn started() -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            fail_with: None,
        }
    }

    pub fn failing(err: EventError) -> Self {
        Self {
            fail_with: Some(err),
            ..Self::started()
        }
    }

    pub fn commands(&self) -> Vec<serde_json::Value> {
        self.commands.lock().expect("lock").clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventSender for RecordingSender {
    async fn start(&self, _ctx: &CancellationToken) -> Result<(), EventError> {
        Ok(())
    }

    async fn send(
        &self,
        _ctx: &CancellationToken,
        message: CommandMessage,
    ) -> Result<(), EventError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        let value = serde_json::from_slice(message.body()).expect("json command");
        self.commands.lock().expect("lock").push(value);
        Ok(())
    }

    async fn publish(
        &self,
        _ctx: &CancellationToken,
        _message: TopicMessage,
    ) -> Result<(), EventError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), EventError> {
        Ok(())
    }

    async fn status(&self) -> SenderStatus {
        if self.fail_with.is_some() {
            SenderStatus::NotStarted
        } else {
            SenderStatus::Started
        }
    }
}

/// 记录转发的数据包，可配置为固定失败。
#[derive(Default)]
pub struct RecordingForwarder {
    packs: Mutex<Vec<SenmlPack>>,
    fail_with: Option<ForwardError>,
}

impl RecordingForwarder {
    pub fn failing(err: ForwardError) -> Self {
        Self {
            fail_with: Some(err),
            ..Default::default()
        }
    }

    pub fn packs(&self) -> Vec<SenmlPack> {
        self.packs.lock().expect("lock").clone()
    }
}

#[async_trait]
impl SenmlForwarder for RecordingForwarder {
    async fn forward(&self, pack: &SenmlPack) -> Result<(), ForwardError> {
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        self.packs.lock().expect("lock").push(pack.clone());
        Ok(())
    }
}
