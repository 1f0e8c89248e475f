use crate::telemetry::ChannelSet;
use serde::{Deserialize, Serialize};

/// Detection thresholds. Defaults match the tuned values; tests override
/// individual fields without touching the detection code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Fix-type ordinals below this count as a poor fix.
    pub poor_fix_ordinal: u8,
    /// Fraction of poor-fix GPS samples above which instability is flagged.
    pub poor_fix_ratio: f64,
    /// Per-axis vibration magnitude above which a sample counts as high.
    pub high_vibe_threshold: f64,
    /// Fraction of high-vibration samples above which vibration is flagged.
    pub high_vibe_ratio: f64,
    /// Battery voltage below which any single sample is flagged.
    pub low_voltage: f64,
    /// Adjacent-sample altitude loss in meters above which a drop is flagged.
    pub altitude_drop: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            poor_fix_ordinal: 3,
            poor_fix_ratio: 0.10,
            high_vibe_threshold: 30.0,
            high_vibe_ratio: 0.05,
            low_voltage: 3.3,
            altitude_drop: 5.0,
        }
    }
}

pub const GPS_INSTABILITY: &str = "GPS signal instability detected";
pub const HIGH_VIBRATION: &str = "High vibration levels detected";
pub const LOW_BATTERY_VOLTAGE: &str = "Low battery voltage detected";
pub const ALTITUDE_DROP: &str = "Sudden altitude drop detected";

/// Deterministic anomaly detection over the normalized channels. Always runs,
/// never calls out, never fails.
pub fn detect(channels: &ChannelSet, cfg: &DetectionConfig) -> Vec<String> {
    let mut anomalies = Vec::new();

    if !channels.gps.is_empty() {
        let poor = channels
            .gps
            .iter()
            .filter(|g| g.fix_type < cfg.poor_fix_ordinal)
            .count();
        if (poor as f64) / (channels.gps.len() as f64) > cfg.poor_fix_ratio {
            anomalies.push(GPS_INSTABILITY.to_string());
        }
    }

    if !channels.vibration.is_empty() {
        let high = channels
            .vibration
            .iter()
            .filter(|v| v.vibe_x.abs() > cfg.high_vibe_threshold || v.vibe_y.abs() > cfg.high_vibe_threshold)
            .count();
        if (high as f64) / (channels.vibration.len() as f64) > cfg.high_vibe_ratio {
            anomalies.push(HIGH_VIBRATION.to_string());
        }
    }

    let battery = channels.preferred_battery_series();
    if battery.iter().any(|(voltage, _, _)| *voltage < cfg.low_voltage) {
        anomalies.push(LOW_BATTERY_VOLTAGE.to_string());
    }

    // Existence check only: the first qualifying drop settles it.
    let altitude = channels.preferred_altitude_series();
    for w in altitude.windows(2) {
        if w[0].1 - w[1].1 > cfg.altitude_drop {
            anomalies.push(ALTITUDE_DROP.to_string());
            break;
        }
    }

    anomalies
}
