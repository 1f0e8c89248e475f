use flightscope::heuristics::{self, DetectionConfig};
use flightscope::telemetry::{BatterySample, ChannelSet, GpsSample, PositionSample, SystemStatusSample, VibrationSample};

fn gps_with_fix(fix_type: u8) -> GpsSample {
    GpsSample { time: 0.0, lat: 0.0, lon: 0.0, alt: 0.0, fix_type, hdop: 1.0, num_sats: 10, speed: 0.0 }
}

fn altitude_channel(alts: &[f64]) -> ChannelSet {
    let mut ch = ChannelSet::default();
    for (i, alt) in alts.iter().enumerate() {
        ch.position.push(PositionSample {
            time: i as f64,
            lat: 0.0,
            lon: 0.0,
            alt: *alt,
            relative_alt: *alt,
            vx: 0.0,
            vy: 0.0,
            vz: 0.0,
        });
    }
    ch
}

#[test]
fn gps_instability_requires_strictly_more_than_ten_percent() {
    // Exactly 10% poor fixes: must not fire.
    let mut ch = ChannelSet::default();
    for i in 0..100 {
        ch.gps.push(gps_with_fix(if i < 10 { 0 } else { 3 }));
    }
    let anomalies = heuristics::detect(&ch, &DetectionConfig::default());
    assert!(!anomalies.iter().any(|a| a.contains("GPS")));

    // One more poor fix tips it over.
    ch.gps.push(gps_with_fix(0));
    let anomalies = heuristics::detect(&ch, &DetectionConfig::default());
    assert!(anomalies.iter().any(|a| a.contains("GPS")));
}

#[test]
fn altitude_drop_fires_strictly_above_five_meters() {
    let exactly_five = altitude_channel(&[20.0, 15.0, 15.0]);
    let anomalies = heuristics::detect(&exactly_five, &DetectionConfig::default());
    assert!(!anomalies.iter().any(|a| a.contains("altitude")));

    let over_five = altitude_channel(&[20.0, 14.99, 14.99]);
    let anomalies = heuristics::detect(&over_five, &DetectionConfig::default());
    assert!(anomalies.iter().any(|a| a.contains("altitude")));
}

#[test]
fn altitude_drop_reported_once_despite_multiple_drops() {
    let ch = altitude_channel(&[30.0, 20.0, 10.0, 0.0]);
    let anomalies = heuristics::detect(&ch, &DetectionConfig::default());
    assert_eq!(
        anomalies.iter().filter(|a| a.contains("altitude")).count(),
        1
    );
}

#[test]
fn high_vibration_needs_more_than_five_percent_of_samples() {
    let mut ch = ChannelSet::default();
    for i in 0..100 {
        let x = if i < 5 { 35.0 } else { 10.0 };
        ch.vibration.push(VibrationSample { time: i as f64, vibe_x: x, vibe_y: 5.0, vibe_z: 5.0 });
    }
    let anomalies = heuristics::detect(&ch, &DetectionConfig::default());
    assert!(!anomalies.iter().any(|a| a.contains("vibration")));

    ch.vibration.push(VibrationSample { time: 100.0, vibe_x: 0.0, vibe_y: 40.0, vibe_z: 0.0 });
    let anomalies = heuristics::detect(&ch, &DetectionConfig::default());
    assert!(anomalies.iter().any(|a| a.contains("vibration")));
}

#[test]
fn any_low_voltage_sample_flags_battery() {
    let mut ch = ChannelSet::default();
    ch.battery.push(BatterySample { time: 0.0, voltage: 12.6, current: 5.0, remaining: 90.0 });
    ch.battery.push(BatterySample { time: 1.0, voltage: 3.2, current: 5.0, remaining: 40.0 });
    let anomalies = heuristics::detect(&ch, &DetectionConfig::default());
    assert!(anomalies.iter().any(|a| a.contains("battery")));
}

#[test]
fn voltage_check_uses_preferred_battery_channel() {
    // Raw battery sags but system_status is healthy; system_status wins.
    let mut ch = ChannelSet::default();
    ch.battery.push(BatterySample { time: 0.0, voltage: 3.0, current: 5.0, remaining: 90.0 });
    ch.system_status.push(SystemStatusSample { time: 0.0, voltage: 12.0, current: 5.0, remaining: 90.0 });
    let anomalies = heuristics::detect(&ch, &DetectionConfig::default());
    assert!(!anomalies.iter().any(|a| a.contains("battery")));
}

#[test]
fn thresholds_come_from_config_not_code() {
    let ch = altitude_channel(&[10.0, 7.0]);
    let strict = DetectionConfig { altitude_drop: 2.0, ..Default::default() };
    let anomalies = heuristics::detect(&ch, &strict);
    assert!(anomalies.iter().any(|a| a.contains("altitude")));

    let lax = DetectionConfig { altitude_drop: 10.0, ..Default::default() };
    assert!(heuristics::detect(&ch, &lax).is_empty());
}
