use flightscope::digest::{self, trend_sample};
use flightscope::telemetry::{BatterySample, ChannelSet, GpsSample, PositionSample, VibrationSample};

fn gps(fix_type: u8, hdop: f64, sats: u32) -> GpsSample {
    GpsSample { time: 0.0, lat: 0.0, lon: 0.0, alt: 0.0, fix_type, hdop, num_sats: sats, speed: 0.0 }
}

#[test]
fn trend_sample_takes_first_and_last_five() {
    let series: Vec<f64> = (1..=15).map(|v| v as f64).collect();
    let trend = trend_sample(&series);
    assert_eq!(trend, vec![1.0, 2.0, 3.0, 4.0, 5.0, 11.0, 12.0, 13.0, 14.0, 15.0]);

    let short = vec![1.0, 2.0, 3.0, 4.0, 5.0];
    assert_eq!(trend_sample(&short), short);
}

#[test]
fn downsample_bounds_profile_to_twenty_points() {
    let series: Vec<f64> = (0..100).map(|v| v as f64).collect();
    let profile = digest::downsample(&series, 20);
    assert_eq!(profile.len(), 20);
    assert_eq!(profile[0], 0.0);
    assert_eq!(profile[1], 5.0);

    // Short series pass through untouched.
    let short: Vec<f64> = (0..7).map(|v| v as f64).collect();
    assert_eq!(digest::downsample(&short, 20), short);
}

#[test]
fn empty_channels_have_no_digest_entries() {
    let d = digest::build(&ChannelSet::default());
    assert!(d.counts.is_empty());
    assert!(d.gps.is_none());
    assert!(d.vibration.is_none());
    assert!(d.battery.is_none());
    assert!(d.altitude.is_none());
}

#[test]
fn fix_histogram_buckets_by_ordinal_band() {
    let mut ch = ChannelSet::default();
    for fix in [0, 1, 2, 3, 3, 4, 5, 6] {
        ch.gps.push(gps(fix, 1.0, 10));
    }
    let d = digest::build(&ch);
    let h = d.gps.unwrap().fix_histogram;
    assert_eq!(h.no_fix, 2);
    assert_eq!(h.gps_fix, 3);
    assert_eq!(h.dgps_fix, 1);
    assert_eq!(h.rtk_fix, 2);
}

#[test]
fn hdop_sentinels_are_excluded() {
    let mut ch = ChannelSet::default();
    ch.gps.push(gps(3, 0.0, 10)); // sentinel
    ch.gps.push(gps(3, -1.0, 11)); // sentinel
    ch.gps.push(gps(3, 1.4, 12));
    ch.gps.push(gps(3, 2.2, 9));

    let g = digest::build(&ch).gps.unwrap();
    let hdop = g.hdop.unwrap();
    assert!((hdop.min - 1.4).abs() < 1e-9);
    assert!((hdop.max - 2.2).abs() < 1e-9);
    let sats = g.num_sats.unwrap();
    assert_eq!(sats.min, 9.0);
    assert_eq!(sats.max, 12.0);

    // All-sentinel HDOP leaves the range absent, not zeroed.
    let mut ch = ChannelSet::default();
    ch.gps.push(gps(3, 0.0, 10));
    assert!(digest::build(&ch).gps.unwrap().hdop.is_none());
}

#[test]
fn vibration_digest_tracks_per_axis_ranges() {
    let mut ch = ChannelSet::default();
    ch.vibration.push(VibrationSample { time: 0.0, vibe_x: 5.0, vibe_y: 8.0, vibe_z: 2.0 });
    ch.vibration.push(VibrationSample { time: 1.0, vibe_x: 25.0, vibe_y: 3.0, vibe_z: 7.0 });

    let v = digest::build(&ch).vibration.unwrap();
    assert_eq!(v.x.min, 5.0);
    assert_eq!(v.x.max, 25.0);
    assert_eq!(v.y.min, 3.0);
    assert_eq!(v.y.max, 8.0);
}

#[test]
fn battery_digest_filters_zero_current() {
    let mut ch = ChannelSet::default();
    for (i, (v, c)) in [(12.6, 0.0), (12.3, 14.0), (12.0, 9.0)].iter().enumerate() {
        ch.battery.push(BatterySample { time: i as f64, voltage: *v, current: *c, remaining: 50.0 });
    }
    let b = digest::build(&ch).battery.unwrap();
    assert_eq!(b.voltage.min, 12.0);
    assert_eq!(b.voltage.max, 12.6);
    let current = b.current.unwrap();
    assert_eq!(current.min, 9.0);
    assert_eq!(current.max, 14.0);
    assert_eq!(b.voltage_trend, vec![12.6, 12.3, 12.0]);

    // All-zero current means no current range at all.
    let mut ch = ChannelSet::default();
    ch.battery.push(BatterySample { time: 0.0, voltage: 12.0, current: 0.0, remaining: 50.0 });
    assert!(digest::build(&ch).battery.unwrap().current.is_none());
}

#[test]
fn altitude_digest_captures_largest_steps() {
    let mut ch = ChannelSet::default();
    for (i, alt) in [10.0, 14.0, 12.0, 20.0, 13.5].iter().enumerate() {
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
    let a = digest::build(&ch).altitude.unwrap();
    assert_eq!(a.range.min, 10.0);
    assert_eq!(a.range.max, 20.0);
    assert!((a.largest_climb - 8.0).abs() < 1e-9);
    assert!((a.largest_drop + 6.5).abs() < 1e-9);
    assert_eq!(a.profile.len(), 5);
}

#[test]
fn counts_cover_populated_channels_only() {
    let mut ch = ChannelSet::default();
    ch.gps.push(gps(3, 1.0, 10));
    ch.vibration.push(VibrationSample { time: 0.0, vibe_x: 1.0, vibe_y: 1.0, vibe_z: 1.0 });

    let d = digest::build(&ch);
    assert_eq!(d.counts.len(), 2);
    assert_eq!(d.counts.get("gps"), Some(&1));
    assert_eq!(d.counts.get("vibration"), Some(&1));
    assert!(!d.counts.contains_key("battery"));
}
