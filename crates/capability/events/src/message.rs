use crate::error::EventError;
use serde::Serialize;

const JSON_CONTENT_TYPE: &str = "application/json";

/// 点对点命令消息（目的队列由发送方决定）。
#[derive(Debug, Clone, PartialEq)]
pub struct CommandMessage {
    content_type: String,
    body: Vec<u8>,
}

impl CommandMessage {
    pub fn new(content_type: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            content_type: content_type.into(),
            body,
        }
    }

    pub fn json<T: Serialize>(value: &T) -> Result<Self, EventError> {
        let body = serde_json::to_vec(value).map_err(|err| EventError::Encode(err.to_string()))?;
        Ok(Self::new(JSON_CONTENT_TYPE, body))
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

/// 主题消息，主题名由消息自身携带。
#[derive(Debug, Clone, PartialEq)]
pub struct TopicMessage {
    topic: String,
    content_type: String,
    body: Vec<u8>,
}

impl TopicMessage {
    pub fn new(topic: impl Into<String>, content_type: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            content_type: content_type.into(),
            body,
        }
    }

    pub fn json<T: Serialize>(topic: impl Into<String>, value: &T) -> Result<Self, EventError> {
        let body = serde_json::to_vec(value).map_err(|err| EventError::Encode(err.to_string()))?;
        Ok(Self::new(topic, JSON_CONTENT_TYPE, body))
    }

    pub fn topic_name(&self) -> &str {
        &self.topic
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}
