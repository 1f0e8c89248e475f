use flightscope::heuristics::DetectionConfig;
use flightscope::summary;
use flightscope::telemetry::{BatterySample, ChannelSet, GpsSample, PositionSample, SystemStatusSample};

fn gps(time: f64, alt: f64) -> GpsSample {
    GpsSample { time, lat: 0.0, lon: 0.0, alt, fix_type: 3, hdop: 1.0, num_sats: 12, speed: 0.0 }
}

fn position(time: f64, alt: f64, vx: f64, vy: f64, vz: f64) -> PositionSample {
    PositionSample { time, lat: 0.0, lon: 0.0, alt, relative_alt: alt, vx, vy, vz }
}

#[test]
fn duration_and_max_altitude_prefer_position() {
    let mut ch = ChannelSet::default();
    ch.position.push(position(100.0, 10.0, 0.0, 0.0, 0.0));
    ch.position.push(position(160.0, 42.5, 0.0, 0.0, 0.0));
    ch.gps.push(gps(0.0, 999.0)); // ignored while position data exists

    let s = summary::summarize(&ch, &DetectionConfig::default(), None);
    assert!((s.duration - 60.0).abs() < 1e-9);
    assert!((s.max_altitude - 42.5).abs() < 1e-9);
}

#[test]
fn falls_back_to_gps_when_position_empty() {
    let mut ch = ChannelSet::default();
    ch.gps.push(gps(10.0, 5.0));
    ch.gps.push(gps(25.0, 30.0));

    let s = summary::summarize(&ch, &DetectionConfig::default(), None);
    assert!((s.duration - 15.0).abs() < 1e-9);
    assert!((s.max_altitude - 30.0).abs() < 1e-9);
}

#[test]
fn max_altitude_equals_series_max() {
    let alts = [3.0, 18.0, 11.0, 17.9];
    let mut ch = ChannelSet::default();
    for (i, a) in alts.iter().enumerate() {
        ch.position.push(position(i as f64, *a, 0.0, 0.0, 0.0));
    }
    let s = summary::summarize(&ch, &DetectionConfig::default(), None);
    assert_eq!(s.max_altitude, 18.0);
}

#[test]
fn max_speed_is_euclidean_norm_of_position_velocity() {
    let mut ch = ChannelSet::default();
    ch.position.push(position(0.0, 0.0, 3.0, 4.0, 0.0)); // 5.0
    ch.position.push(position(1.0, 0.0, 1.0, 2.0, 2.0)); // 3.0
    let s = summary::summarize(&ch, &DetectionConfig::default(), None);
    assert!((s.max_speed - 5.0).abs() < 1e-9);
}

#[test]
fn gps_only_flight_has_zero_speed() {
    let mut ch = ChannelSet::default();
    ch.gps.push(gps(0.0, 10.0));
    ch.gps.push(gps(1.0, 10.0));
    let s = summary::summarize(&ch, &DetectionConfig::default(), None);
    assert_eq!(s.max_speed, 0.0);
}

#[test]
fn battery_usage_is_signed_first_minus_last() {
    let mut ch = ChannelSet::default();
    for (i, rem) in [95.0, 80.0, 62.0].iter().enumerate() {
        ch.battery.push(BatterySample { time: i as f64, voltage: 12.0, current: 5.0, remaining: *rem });
    }
    let s = summary::summarize(&ch, &DetectionConfig::default(), None);
    assert!((s.battery_usage - 33.0).abs() < 1e-9);

    // Increasing remaining reads as a negative delta.
    let mut ch = ChannelSet::default();
    ch.battery.push(BatterySample { time: 0.0, voltage: 12.0, current: 5.0, remaining: 50.0 });
    ch.battery.push(BatterySample { time: 1.0, voltage: 12.0, current: 5.0, remaining: 60.0 });
    let s = summary::summarize(&ch, &DetectionConfig::default(), None);
    assert!((s.battery_usage + 10.0).abs() < 1e-9);
}

#[test]
fn system_status_preferred_over_raw_battery() {
    let mut ch = ChannelSet::default();
    ch.battery.push(BatterySample { time: 0.0, voltage: 12.0, current: 1.0, remaining: 10.0 });
    ch.battery.push(BatterySample { time: 1.0, voltage: 12.0, current: 1.0, remaining: 5.0 });
    ch.system_status.push(SystemStatusSample { time: 0.0, voltage: 12.0, current: 1.0, remaining: 90.0 });
    ch.system_status.push(SystemStatusSample { time: 1.0, voltage: 12.0, current: 1.0, remaining: 70.0 });

    let s = summary::summarize(&ch, &DetectionConfig::default(), None);
    assert!((s.battery_usage - 20.0).abs() < 1e-9);
}

#[test]
fn empty_channels_yield_zero_metrics() {
    let s = summary::summarize(&ChannelSet::default(), &DetectionConfig::default(), None);
    assert_eq!(s.duration, 0.0);
    assert_eq!(s.max_altitude, 0.0);
    assert_eq!(s.max_speed, 0.0);
    assert_eq!(s.battery_usage, 0.0);
    assert!(s.anomalies.is_empty());
}
