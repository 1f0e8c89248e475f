use crate::telemetry::ChannelSet;
use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-channel statistical digests. A channel with no samples gets no digest
/// entry at all, so consumers can tell "no data" from "zero value".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternDigest {
    pub counts: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps: Option<GpsDigest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibration: Option<VibrationDigest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery: Option<BatteryDigest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude: Option<AltitudeDigest>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMax {
    pub min: f64,
    pub max: f64,
}

/// Fix-quality histogram over ordinal bands: <2 no fix, 2-3 plain GPS fix,
/// 4 differential, >=5 RTK.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FixHistogram {
    pub no_fix: usize,
    pub gps_fix: usize,
    pub dgps_fix: usize,
    pub rtk_fix: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpsDigest {
    pub fix_histogram: FixHistogram,
    /// HDOP range over positive values; values <= 0 are missing-data sentinels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hdop: Option<MinMax>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_sats: Option<MinMax>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VibrationDigest {
    pub x: MinMax,
    pub y: MinMax,
    pub z: MinMax,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatteryDigest {
    pub voltage: MinMax,
    /// Current range over nonzero readings; zero means sensor absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<MinMax>,
    /// First 5 and last 5 voltages when more than 10 samples exist, else the
    /// full series.
    pub voltage_trend: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AltitudeDigest {
    pub range: MinMax,
    /// Largest positive step-to-step delta; zero when no climb occurred.
    pub largest_climb: f64,
    /// Largest negative step-to-step delta (a negative number); zero when no
    /// descent occurred.
    pub largest_drop: f64,
    /// Uniformly down-sampled altitude profile, at most 20 points.
    pub profile: Vec<f64>,
}

pub fn build(channels: &ChannelSet) -> PatternDigest {
    let mut digest = PatternDigest::default();

    for (name, count) in [
        ("gps", channels.gps.len()),
        ("attitude", channels.attitude.len()),
        ("battery", channels.battery.len()),
        ("vibration", channels.vibration.len()),
        ("barometer", channels.barometer.len()),
        ("mode", channels.mode.len()),
        ("position", channels.position.len()),
        ("system_status", channels.system_status.len()),
    ] {
        if count > 0 {
            digest.counts.insert(name.to_string(), count);
        }
    }

    if !channels.gps.is_empty() {
        let mut hist = FixHistogram::default();
        for g in &channels.gps {
            match g.fix_type {
                0 | 1 => hist.no_fix += 1,
                2 | 3 => hist.gps_fix += 1,
                4 => hist.dgps_fix += 1,
                _ => hist.rtk_fix += 1,
            }
        }
        let hdop = min_max(channels.gps.iter().map(|g| g.hdop).filter(|h| *h > 0.0));
        let num_sats = min_max(channels.gps.iter().map(|g| g.num_sats as f64));
        digest.gps = Some(GpsDigest { fix_histogram: hist, hdop, num_sats });
    }

    if !channels.vibration.is_empty() {
        let x = min_max(channels.vibration.iter().map(|v| v.vibe_x));
        let y = min_max(channels.vibration.iter().map(|v| v.vibe_y));
        let z = min_max(channels.vibration.iter().map(|v| v.vibe_z));
        if let (Some(x), Some(y), Some(z)) = (x, y, z) {
            digest.vibration = Some(VibrationDigest { x, y, z });
        }
    }

    let battery = channels.preferred_battery_series();
    if !battery.is_empty() {
        let voltages: Vec<f64> = battery.iter().map(|(v, _, _)| *v).collect();
        if let Some(voltage) = min_max(voltages.iter().copied()) {
            let current = min_max(battery.iter().map(|(_, c, _)| *c).filter(|c| *c != 0.0));
            digest.battery = Some(BatteryDigest {
                voltage,
                current,
                voltage_trend: trend_sample(&voltages),
            });
        }
    }

    let altitude: Vec<f64> = channels
        .preferred_altitude_series()
        .into_iter()
        .map(|(_, alt)| alt)
        .collect();
    if !altitude.is_empty() {
        if let Some(range) = min_max(altitude.iter().copied()) {
            let mut largest_climb = 0.0f64;
            let mut largest_drop = 0.0f64;
            for w in altitude.windows(2) {
                let delta = w[1] - w[0];
                largest_climb = largest_climb.max(delta);
                largest_drop = largest_drop.min(delta);
            }
            digest.altitude = Some(AltitudeDigest {
                range,
                largest_climb,
                largest_drop,
                profile: downsample(&altitude, 20),
            });
        }
    }

    digest
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<MinMax> {
    match values.minmax_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal)) {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(v) => Some(MinMax { min: v, max: v }),
        MinMaxResult::MinMax(min, max) => Some(MinMax { min, max }),
    }
}

/// Bounded trend sample: first 5 and last 5 when the series is longer than
/// 10, the full series otherwise.
pub fn trend_sample(series: &[f64]) -> Vec<f64> {
    if series.len() > 10 {
        let mut out = series[..5].to_vec();
        out.extend_from_slice(&series[series.len() - 5..]);
        out
    } else {
        series.to_vec()
    }
}

/// Uniform down-sampling to at most `max_points` with stride ceil(n / max).
pub fn downsample(series: &[f64], max_points: usize) -> Vec<f64> {
    if series.is_empty() || max_points == 0 {
        return Vec::new();
    }
    let stride = series.len().div_ceil(max_points).max(1);
    series.iter().step_by(stride).copied().collect()
}
