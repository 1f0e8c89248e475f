use crate::telemetry::{
    AttitudeSample, BarometerSample, BatterySample, ChannelSet, DecodedMessage, GpsSample,
    ModeSample, PositionSample, SystemStatusSample, TelemetrySample, VibrationSample,
};
use ahash::AHashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("file is empty")]
    Empty,
    #[error("file exceeds size limit of {0} bytes")]
    Oversized(u64),
    #[error("unsupported file extension: {0}")]
    WrongExtension(String),
    #[error("no messages found in log")]
    NoMessages,
    #[error("no essential telemetry channels present")]
    NoEssentialTelemetry,
    #[error("parse exceeded wall-clock budget of {0:?}")]
    Timeout(Duration),
    #[error("log too complex: more than {0} messages")]
    TooComplex(usize),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Resource-exhaustion guards for ingestion. These bound the parse, they do
/// not tune it.
#[derive(Debug, Clone)]
pub struct IngestLimits {
    pub max_messages: usize,
    pub max_wall_clock: Duration,
    pub max_file_bytes: u64,
    pub allowed_extensions: &'static [&'static str],
}

impl Default for IngestLimits {
    fn default() -> Self {
        Self {
            max_messages: 1_000_000,
            max_wall_clock: Duration::from_secs(60),
            max_file_bytes: 100 * 1024 * 1024,
            allowed_extensions: &["bin", "log", "jsonl"],
        }
    }
}

/// Output of normalization: the channel sequences plus the bookkeeping the
/// summary layer reports back to the user.
#[derive(Debug, Clone, Default)]
pub struct NormalizedLog {
    pub channels: ChannelSet,
    pub total_messages: usize,
    pub message_types: AHashMap<String, usize>,
    pub skipped: usize,
}

/// Group decoded messages into per-channel sequences in encounter order.
///
/// Unknown message types count toward totals but produce no samples. A
/// message whose fields cannot be read is skipped with a warning; only the
/// resource guards abort the run.
pub fn normalize(
    messages: impl IntoIterator<Item = DecodedMessage>,
    limits: &IngestLimits,
) -> Result<NormalizedLog, IngestError> {
    let started = Instant::now();
    let mut out = NormalizedLog::default();

    for msg in messages {
        if out.total_messages >= limits.max_messages {
            return Err(IngestError::TooComplex(limits.max_messages));
        }
        if started.elapsed() > limits.max_wall_clock {
            return Err(IngestError::Timeout(limits.max_wall_clock));
        }
        out.total_messages += 1;
        *out.message_types.entry(msg.msg_type.clone()).or_insert(0) += 1;

        match extract_sample(&msg) {
            Ok(Some(sample)) => out.channels.push(sample),
            Ok(None) => {} // unknown type, counted only
            Err(reason) => {
                out.skipped += 1;
                tracing::warn!(msg_type = %msg.msg_type, %reason, "skipping unparsable message");
            }
        }
    }

    if out.total_messages == 0 {
        return Err(IngestError::NoMessages);
    }
    Ok(out)
}

/// Map one decoded message to its channel, converting source units to SI.
/// Native dataflash types carry SI already; standard protocol messages use
/// integer encodings (1e-7 deg, mm, cm/s, mV, cA).
fn extract_sample(msg: &DecodedMessage) -> Result<Option<TelemetrySample>, String> {
    if !msg.time.is_finite() {
        return Err("non-finite timestamp".to_string());
    }
    let s = match msg.msg_type.as_str() {
        "GPS" => TelemetrySample::Gps(GpsSample {
            time: msg.time,
            lat: msg.num("Lat"),
            lon: msg.num("Lng"),
            alt: msg.num("Alt"),
            fix_type: msg.num("Status") as u8,
            hdop: msg.num("HDop"),
            num_sats: msg.num("NSats") as u32,
            speed: msg.num("Spd"),
        }),
        "GPS_RAW_INT" => TelemetrySample::Gps(GpsSample {
            time: msg.time,
            lat: msg.num("lat") * 1e-7,
            lon: msg.num("lon") * 1e-7,
            alt: msg.num("alt") / 1000.0,
            fix_type: msg.num("fix_type") as u8,
            hdop: msg.num("eph") / 100.0,
            num_sats: msg.num("satellites_visible") as u32,
            speed: msg.num("vel") / 100.0,
        }),
        "GLOBAL_POSITION_INT" => TelemetrySample::Position(PositionSample {
            time: msg.time,
            lat: msg.num("lat") * 1e-7,
            lon: msg.num("lon") * 1e-7,
            alt: msg.num("alt") / 1000.0,
            relative_alt: msg.num("relative_alt") / 1000.0,
            vx: msg.num("vx") / 100.0,
            vy: msg.num("vy") / 100.0,
            vz: msg.num("vz") / 100.0,
        }),
        "ATT" => TelemetrySample::Attitude(AttitudeSample {
            time: msg.time,
            roll: msg.num("Roll"),
            pitch: msg.num("Pitch"),
            yaw: msg.num("Yaw"),
        }),
        "ATTITUDE" => TelemetrySample::Attitude(AttitudeSample {
            time: msg.time,
            roll: msg.num("roll"),
            pitch: msg.num("pitch"),
            yaw: msg.num("yaw"),
        }),
        "BAT" => TelemetrySample::Battery(BatterySample {
            time: msg.time,
            voltage: msg.num("Volt"),
            current: msg.num("Curr"),
            remaining: msg.num("CurrTot"),
        }),
        "BATTERY_STATUS" => TelemetrySample::Battery(BatterySample {
            time: msg.time,
            voltage: first_cell_voltage(msg) / 1000.0,
            current: msg.num("current_battery") / 100.0,
            remaining: msg.num("battery_remaining"),
        }),
        "SYS_STATUS" => TelemetrySample::SystemStatus(SystemStatusSample {
            time: msg.time,
            voltage: msg.num("voltage_battery") / 1000.0,
            current: msg.num("current_battery") / 100.0,
            remaining: msg.num("battery_remaining"),
        }),
        "VIBE" => TelemetrySample::Vibration(VibrationSample {
            time: msg.time,
            vibe_x: msg.num("VibeX"),
            vibe_y: msg.num("VibeY"),
            vibe_z: msg.num("VibeZ"),
        }),
        "VIBRATION" => TelemetrySample::Vibration(VibrationSample {
            time: msg.time,
            vibe_x: msg.num("vibration_x"),
            vibe_y: msg.num("vibration_y"),
            vibe_z: msg.num("vibration_z"),
        }),
        "BARO" => TelemetrySample::Barometer(BarometerSample {
            time: msg.time,
            altitude: msg.num("Alt"),
            pressure: msg.num("Press"),
            temperature: msg.num("Temp"),
        }),
        "MODE" => TelemetrySample::Mode(ModeSample {
            time: msg.time,
            mode: msg.num("Mode") as u32,
            mode_num: msg.num("ModeNum") as u32,
        }),
        _ => return Ok(None),
    };
    Ok(Some(s))
}

// voltages arrives as an array of per-cell millivolts; only the first cell is
// meaningful on most single-battery airframes.
fn first_cell_voltage(msg: &DecodedMessage) -> f64 {
    match msg.fields.get("voltages") {
        Some(serde_json::Value::Array(cells)) => {
            cells.first().and_then(|v| v.as_f64()).unwrap_or(0.0)
        }
        _ => msg.num("voltages"),
    }
}

/// File-level pre-flight checks applied before any decoding. Returns the byte
/// size on success so callers can log it.
pub fn check_source_file(path: &std::path::Path, limits: &IngestLimits) -> Result<u64, IngestError> {
    if !path.exists() {
        return Err(IngestError::NotFound(path.display().to_string()));
    }
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if !limits.allowed_extensions.contains(&ext) {
        return Err(IngestError::WrongExtension(ext.to_string()));
    }
    let len = std::fs::metadata(path)
        .map_err(|e| IngestError::Decode(e.to_string()))?
        .len();
    if len == 0 {
        return Err(IngestError::Empty);
    }
    if len > limits.max_file_bytes {
        return Err(IngestError::Oversized(limits.max_file_bytes));
    }
    Ok(len)
}

/// Read decoder output in JSONL form, one `DecodedMessage` per line. Blank
/// lines are ignored; a malformed line is a decode failure for the whole
/// source since the decoder contract is broken at that point.
pub fn read_decoded_jsonl(reader: impl std::io::BufRead) -> Result<Vec<DecodedMessage>, IngestError> {
    let mut out = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| IngestError::Decode(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let msg: DecodedMessage = serde_json::from_str(&line)
            .map_err(|e| IngestError::Decode(format!("line {}: {e}", i + 1)))?;
        out.push(msg);
    }
    Ok(out)
}
