//! SenML 数据包转发
//!
//! 将构造好的 SenML 数据包 POST 到 `{forwarding_endpoint}/lwm2m`，
//! 只有 201 Created 视为成功。

use async_trait::async_trait;
use iot_conversion::SenmlPack;
use iot_telemetry::{record_forward_failure, record_pack_forwarded};
use reqwest::StatusCode;
use tracing::{debug, warn};

/// 转发错误
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForwardError {
    #[error("forward request failed: {0}")]
    Request(String),
    #[error("request failed, expected status code 201 but got status code {0}")]
    Status(u16),
}

/// SenML 转发抽象
#[async_trait]
pub trait SenmlForwarder: Send + Sync {
    async fn forward(&self, pack: &SenmlPack) -> Result<(), ForwardError>;
}

/// 基于 reqwest 的 HTTP 转发器
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    client: reqwest::Client,
    url: String,
}

impl HttpForwarder {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}/lwm2m", endpoint.trim_end_matches('/')),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SenmlForwarder for HttpForwarder {
    async fn forward(&self, pack: &SenmlPack) -> Result<(), ForwardError> {
        debug!(
            target: "iot.forward",
            url = %self.url,
            records = pack.records().len(),
            "forwarding senml pack"
        );
        let response = self
            .client
            .post(&self.url)
            .json(pack)
            .send()
            .await
            .map_err(|err| {
                record_forward_failure();
                ForwardError::Request(err.to_string())
            })?;

        let status = response.status();
        if status != StatusCode::CREATED {
            record_forward_failure();
            warn!(
                target: "iot.forward",
                url = %self.url,
                status = status.as_u16(),
                "forward rejected"
            );
            return Err(ForwardError::Status(status.as_u16()));
        }
        record_pack_forwarded();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_appends_lwm2m() {
        assert_eq!(
            HttpForwarder::new("http://iot-core:8080/").url(),
            "http://iot-core:8080/lwm2m"
        );
        assert_eq!(
            HttpForwarder::new("http://iot-core:8080").url(),
            "http://iot-core:8080/lwm2m"
        );
    }

    #[test]
    fn status_error_names_code() {
        assert_eq!(
            ForwardError::Status(404).to_string(),
            "request failed, expected status code 201 but got status code 404"
        );
    }
}
