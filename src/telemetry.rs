use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One externally decoded log message: a type tag plus a flat field map.
/// The decoder collaborator produces these; this crate never sees raw bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodedMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl DecodedMessage {
    pub fn new(msg_type: &str, time: f64) -> Self {
        Self { msg_type: msg_type.to_string(), time, fields: BTreeMap::new() }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Numeric field accessor; missing or non-numeric fields read as zero.
    pub fn num(&self, key: &str) -> f64 {
        self.fields.get(key).and_then(|v| v.as_f64()).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsSample {
    pub time: f64,
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
    pub fix_type: u8,
    pub hdop: f64,
    pub num_sats: u32,
    pub speed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttitudeSample {
    pub time: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatterySample {
    pub time: f64,
    pub voltage: f64,
    pub current: f64,
    pub remaining: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VibrationSample {
    pub time: f64,
    pub vibe_x: f64,
    pub vibe_y: f64,
    pub vibe_z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarometerSample {
    pub time: f64,
    pub altitude: f64,
    pub pressure: f64,
    pub temperature: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeSample {
    pub time: f64,
    pub mode: u32,
    pub mode_num: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub time: f64,
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
    pub relative_alt: f64,
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemStatusSample {
    pub time: f64,
    pub voltage: f64,
    pub current: f64,
    pub remaining: f64,
}

/// Closed sum over the eight telemetry channels. Adding a channel means adding
/// a variant here and handling it everywhere the compiler points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum TelemetrySample {
    Gps(GpsSample),
    Attitude(AttitudeSample),
    Battery(BatterySample),
    Vibration(VibrationSample),
    Barometer(BarometerSample),
    Mode(ModeSample),
    Position(PositionSample),
    SystemStatus(SystemStatusSample),
}

impl TelemetrySample {
    pub fn channel_name(&self) -> &'static str {
        match self {
            TelemetrySample::Gps(_) => "gps",
            TelemetrySample::Attitude(_) => "attitude",
            TelemetrySample::Battery(_) => "battery",
            TelemetrySample::Vibration(_) => "vibration",
            TelemetrySample::Barometer(_) => "barometer",
            TelemetrySample::Mode(_) => "mode",
            TelemetrySample::Position(_) => "position",
            TelemetrySample::SystemStatus(_) => "system_status",
        }
    }
}

/// The eight normalized channel sequences, in encounter order. Timestamps are
/// not guaranteed monotonic; consumers must not assume sorted order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelSet {
    pub gps: Vec<GpsSample>,
    pub attitude: Vec<AttitudeSample>,
    pub battery: Vec<BatterySample>,
    pub vibration: Vec<VibrationSample>,
    pub barometer: Vec<BarometerSample>,
    pub mode: Vec<ModeSample>,
    pub position: Vec<PositionSample>,
    pub system_status: Vec<SystemStatusSample>,
}

impl ChannelSet {
    pub fn push(&mut self, sample: TelemetrySample) {
        match sample {
            TelemetrySample::Gps(s) => self.gps.push(s),
            TelemetrySample::Attitude(s) => self.attitude.push(s),
            TelemetrySample::Battery(s) => self.battery.push(s),
            TelemetrySample::Vibration(s) => self.vibration.push(s),
            TelemetrySample::Barometer(s) => self.barometer.push(s),
            TelemetrySample::Mode(s) => self.mode.push(s),
            TelemetrySample::Position(s) => self.position.push(s),
            TelemetrySample::SystemStatus(s) => self.system_status.push(s),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.gps.is_empty()
            && self.attitude.is_empty()
            && self.battery.is_empty()
            && self.vibration.is_empty()
            && self.barometer.is_empty()
            && self.mode.is_empty()
            && self.position.is_empty()
            && self.system_status.is_empty()
    }

    /// (time, alt) pairs from the preferred altitude source: fused position
    /// when present, raw GPS otherwise.
    pub fn preferred_altitude_series(&self) -> Vec<(f64, f64)> {
        if !self.position.is_empty() {
            self.position.iter().map(|p| (p.time, p.alt)).collect()
        } else {
            self.gps.iter().map(|g| (g.time, g.alt)).collect()
        }
    }

    /// (voltage, current, remaining) triples from the preferred battery-like
    /// source: system_status when present, raw battery otherwise.
    pub fn preferred_battery_series(&self) -> Vec<(f64, f64, f64)> {
        if !self.system_status.is_empty() {
            self.system_status.iter().map(|s| (s.voltage, s.current, s.remaining)).collect()
        } else {
            self.battery.iter().map(|b| (b.voltage, b.current, b.remaining)).collect()
        }
    }
}
