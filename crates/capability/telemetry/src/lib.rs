//! 追踪、请求 ID 生成与基础计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 计数器快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub uplinks_received: u64,
    pub readings_emitted: u64,
    pub decode_failures: u64,
    pub conversion_failures: u64,
    pub messages_sent: u64,
    pub send_failures: u64,
    pub packs_forwarded: u64,
    pub forward_failures: u64,
}

/// 进程内计数器。
pub struct TelemetryMetrics {
    uplinks_received: AtomicU64,
    readings_emitted: AtomicU64,
    decode_failures: AtomicU64,
    conversion_failures: AtomicU64,
    messages_sent: AtomicU64,
    send_failures: AtomicU64,
    packs_forwarded: AtomicU64,
    forward_failures: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            uplinks_received: AtomicU64::new(0),
            readings_emitted: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            conversion_failures: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
            packs_forwarded: AtomicU64::new(0),
            forward_failures: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uplinks_received: self.uplinks_received.load(Ordering::Relaxed),
            readings_emitted: self.readings_emitted.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            conversion_failures: self.conversion_failures.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            packs_forwarded: self.packs_forwarded.load(Ordering::Relaxed),
            forward_failures: self.forward_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局计数器实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录上行报文接收次数。
pub fn record_uplink_received() {
    metrics().uplinks_received.fetch_add(1, Ordering::Relaxed);
}

/// 记录解码器发出的读数条数。
pub fn record_reading_emitted() {
    metrics().readings_emitted.fetch_add(1, Ordering::Relaxed);
}

/// 记录解码失败次数。
pub fn record_decode_failure() {
    metrics().decode_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录内部格式转换失败次数。
pub fn record_conversion_failure() {
    metrics().conversion_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录消息发送成功次数。
pub fn record_message_sent() {
    metrics().messages_sent.fetch_add(1, Ordering::Relaxed);
}

/// 记录消息发送失败次数。
pub fn record_send_failure() {
    metrics().send_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录 SenML 数据包转发成功次数。
pub fn record_pack_forwarded() {
    metrics().packs_forwarded.fetch_add(1, Ordering::Relaxed);
}

/// 记录 SenML 数据包转发失败次数。
pub fn record_forward_failure() {
    metrics().forward_failures.fetch_add(1, Ordering::Relaxed);
}
