//! 应用运行配置加载。

use std::env;

/// 默认测量类型：温度（LwM2M 3303）。
pub const DEFAULT_MEASUREMENT_TYPE: &str = "urn:oma:lwm2m:ext:3303";

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    /// SenML 数据包转发的基础 URL（会拼接 `/lwm2m`）
    pub forwarding_endpoint: String,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    /// 命令与事件的下发前缀
    pub mqtt_topic_prefix: String,
    /// 上行报文订阅前缀
    pub mqtt_uplink_topic_prefix: String,
    pub mqtt_qos: u8,
    pub ingest_enabled: bool,
    pub measurement_type: String,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let forwarding_endpoint = env::var("IOT_AGENT_FORWARDING_ENDPOINT")
            .ok()
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ConfigError::Missing("IOT_AGENT_FORWARDING_ENDPOINT".to_string()))?
            .trim_end_matches('/')
            .to_string();
        let http_addr =
            env::var("IOT_AGENT_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let mqtt_host = env::var("IOT_AGENT_MQTT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let mqtt_port = read_u16_with_default("IOT_AGENT_MQTT_PORT", 1883)?;
        let mqtt_username = read_optional("IOT_AGENT_MQTT_USERNAME");
        let mqtt_password = read_optional("IOT_AGENT_MQTT_PASSWORD");
        let mqtt_topic_prefix =
            env::var("IOT_AGENT_MQTT_TOPIC_PREFIX").unwrap_or_else(|_| "iot-agent".to_string());
        let mqtt_uplink_topic_prefix = env::var("IOT_AGENT_MQTT_UPLINK_TOPIC_PREFIX")
            .unwrap_or_else(|_| format!("{}/uplinks", mqtt_topic_prefix.trim_end_matches('/')));
        let mqtt_qos = read_u8_with_default("IOT_AGENT_MQTT_QOS", 1)?;
        if mqtt_qos > 2 {
            return Err(ConfigError::Invalid(
                "IOT_AGENT_MQTT_QOS".to_string(),
                mqtt_qos.to_string(),
            ));
        }
        let ingest_enabled = read_bool_with_default("IOT_AGENT_INGEST", false);
        let measurement_type = read_optional("IOT_AGENT_MEASUREMENT_TYPE")
            .unwrap_or_else(|| DEFAULT_MEASUREMENT_TYPE.to_string());

        Ok(Self {
            http_addr,
            forwarding_endpoint,
            mqtt_host,
            mqtt_port,
            mqtt_username,
            mqtt_password,
            mqtt_topic_prefix,
            mqtt_uplink_topic_prefix,
            mqtt_qos,
            ingest_enabled,
            measurement_type,
        })
    }
}

fn read_u16_with_default(key: &str, default: u16) -> Result<u16, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u16>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u8_with_default(key: &str, default: u8) -> Result<u8, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u8>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
