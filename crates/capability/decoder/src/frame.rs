//! 探头类传感器的二进制帧解码
//!
//! 帧布局：
//!
//! ```text
//! | probe type(1) | battery(1) | internal(n) | temp(2) [| temp(2)] |
//! ```
//!
//! 温度为大端 i16，单位 1/16 °C。纯函数，无 I/O。

use crate::error::DecodeError;

/// 最短帧长度
pub const MIN_FRAME_LEN: usize = 4;
/// 单探头
pub const PROBE_SINGLE: u8 = 1;
/// 双探头（未实现，显式拒绝）
pub const PROBE_DUAL: u8 = 12;

/// 探头断开时的固件读数
pub const FAULT_TEMPERATURE_LOW: f32 = -46.75;
/// 传感器故障时的固件读数
pub const FAULT_TEMPERATURE_HIGH: f32 = 85.0;

const BATTERY_FULL_SCALE: f64 = 254.0;

/// 单帧解码结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedReading {
    pub probe_id: u8,
    /// 电量百分比（0-100）
    pub battery_level: u8,
    /// 摄氏度，1/16 °C 精度
    pub temperature: f32,
}

/// 解码一帧。
///
/// 长度不足时在读取任何字节之前返回 `ShortFrame`；
/// 故障哨兵值（-46.75 / 85.0）返回 `SensorFault`。
pub fn decode_frame(frame: &[u8]) -> Result<DecodedReading, DecodeError> {
    if frame.len() < MIN_FRAME_LEN {
        return Err(DecodeError::ShortFrame {
            expected: MIN_FRAME_LEN,
            actual: frame.len(),
        });
    }

    let reading = match frame[0] {
        PROBE_SINGLE => single_probe(frame),
        PROBE_DUAL => return Err(DecodeError::UnsupportedFrame(PROBE_DUAL)),
        other => return Err(DecodeError::UnsupportedFrame(other)),
    };

    if is_fault_reading(reading.temperature) {
        return Err(DecodeError::SensorFault(reading.temperature));
    }

    Ok(reading)
}

fn single_probe(frame: &[u8]) -> DecodedReading {
    let tail = &frame[frame.len() - 2..];
    let raw = i16::from_be_bytes([tail[0], tail[1]]);

    DecodedReading {
        probe_id: frame[0],
        battery_level: battery_percent(frame[1]),
        temperature: f32::from(raw) / 16.0,
    }
}

/// floor(raw / 254 * 100)，按实数计算后再取整。
fn battery_percent(raw: u8) -> u8 {
    let percent = (f64::from(raw) / BATTERY_FULL_SCALE * 100.0).floor();
    percent.min(100.0) as u8
}

fn is_fault_reading(temperature: f32) -> bool {
    temperature == FAULT_TEMPERATURE_LOW || temperature == FAULT_TEMPERATURE_HIGH
}
