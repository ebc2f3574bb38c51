//! Live history buffer

use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};

use obdash_core::history::LiveHistory;
use obdash_core::sample::SampleStore;
use obdash_core::settings::HistorySettings;

#[test]
fn test_keeps_last_capacity_points() {
    let settings = HistorySettings {
        capacity: 30,
        sample_interval_ms: 1000,
    };
    let mut history = LiveHistory::from_settings(&settings);
    let store = SampleStore::new();
    let t0 = Instant::now();

    for i in 0..45u64 {
        store.write(1000.0 + i as f64, true);
        assert!(history.record_at(t0 + Duration::from_secs(i), &store.read()));
    }

    assert_eq!(history.len(), 30);
    let first = history.points().next().unwrap();
    assert_eq!(first.rpm, 1015.0);
    assert_eq!(first.elapsed, Duration::from_secs(15));
    assert_eq!(history.rpm_range(), Some((1015.0, 1044.0)));
}

#[test]
fn test_speed_carried_along() {
    let mut history = LiveHistory::new(5, Duration::ZERO);
    let store = SampleStore::new();
    store.write(2400.0, true);
    store.write_speed(62.0);
    history.record(&store.read());

    assert_eq!(history.latest().unwrap().speed_kph, Some(62.0));
}

#[test]
fn test_sparkline_levels() {
    let mut history = LiveHistory::new(10, Duration::ZERO);
    let store = SampleStore::new();
    let t0 = Instant::now();
    for (i, rpm) in [0.0, 6500.0, 13000.0, 20000.0].into_iter().enumerate() {
        store.write(rpm, true);
        history.record_at(t0 + Duration::from_millis(i as u64), &store.read());
    }

    assert_eq!(history.sparkline(13000.0), "▁▅██");
    assert_eq!(history.sparkline(0.0), "");
}

#[test]
fn test_speed_sparkline_skips_missing_speed() {
    let mut history = LiveHistory::new(10, Duration::ZERO);
    let store = SampleStore::new();
    let t0 = Instant::now();

    store.write(900.0, true);
    history.record_at(t0, &store.read());
    for (i, kph) in [0.0, 100.0, 200.0].into_iter().enumerate() {
        store.write(1500.0, true);
        store.write_speed(kph);
        history.record_at(t0 + Duration::from_millis(i as u64 + 1), &store.read());
    }

    assert_eq!(history.len(), 4);
    assert_eq!(history.speed_sparkline(200.0), "▁▅█");
}
