//! Settings file round-trips

use pretty_assertions::assert_eq;
use std::fs;
use tempfile::tempdir;

use obdash_core::gauge::ConfigError;
use obdash_core::link::{Parameter, VehicleLink};
use obdash_core::poller::PollerConfig;
use obdash_core::settings::{LinkKind, Settings, SettingsError};

#[test]
fn test_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("settings.json");

    let mut settings = Settings::default();
    settings.link.kind = LinkKind::Tcp;
    settings.link.address = "10.0.0.5:35000".to_string();
    settings.gauge.max_value = 8000.0;
    settings.gauge.title = "TACHO".to_string();
    settings.poller.poll_speed = true;
    settings.history.capacity = 60;

    settings.save(&path).unwrap();
    let loaded = Settings::load(&path).unwrap();
    assert_eq!(loaded, settings);
}

#[test]
fn test_missing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.json");

    assert!(matches!(Settings::load(&path), Err(SettingsError::Io(_))));
    assert_eq!(Settings::load_or_default(&path).unwrap(), Settings::default());
}

#[test]
fn test_malformed_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(Settings::load(&path), Err(SettingsError::Parse(_))));
}

#[test]
fn test_invalid_gauge_rejected_on_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(
        &path,
        r#"{ "gauge": { "start_angle_deg": 120, "end_angle_deg": -120 } }"#,
    )
    .unwrap();

    match Settings::load(&path) {
        Err(SettingsError::Invalid(ConfigError::EmptySweep { start, end })) => {
            assert_eq!((start, end), (120.0, -120.0));
        }
        other => panic!("expected invalid sweep, got {:?}", other),
    }
}

#[test]
fn test_tick_flood_rejected_on_parse() {
    let result = Settings::from_json(
        r#"{ "gauge": { "major_tick_step": 0.01, "minor_tick_step": 0.01 } }"#,
    );
    assert!(matches!(
        result,
        Err(SettingsError::Invalid(ConfigError::TooManyTicks { .. }))
    ));
}

#[test]
fn test_zero_backoff_rejected() {
    let result = Settings::from_json(r#"{ "poller": { "reconnect_backoff_ms": 0 } }"#);
    assert!(matches!(
        result,
        Err(SettingsError::ZeroBackoff("reconnect_backoff_ms"))
    ));
    assert!(Settings::from_json(r#"{ "poller": { "failure_backoff_ms": 0 } }"#).is_err());
    assert!(Settings::default().poller.validate().is_ok());
}

#[test]
fn test_link_kind_spelling() {
    let settings = Settings::from_json(r#"{ "link": { "kind": "demo", "demo_fail_every": 4 } }"#)
        .unwrap();
    assert_eq!(settings.link.kind, LinkKind::Demo);
    assert_eq!(settings.link.demo_fail_every, 4);
    assert!(Settings::from_json(r#"{ "link": { "kind": "bluetooth" } }"#).is_err());
}

#[test]
fn test_poller_config_from_settings() {
    let mut settings = Settings::default();
    settings.gauge.poll_interval_ms = 250;
    settings.poller.failure_backoff_ms = 5000;

    let config = PollerConfig::from_settings(&settings.poller, settings.gauge.poll_interval_ms);
    assert_eq!(config.poll_interval.as_millis(), 250);
    assert_eq!(config.failure_backoff.as_millis(), 5000);
    assert_eq!(config.reconnect_backoff.as_millis(), 1000);
}

#[test]
fn test_demo_factory_opens() {
    let mut settings = Settings::default();
    settings.link.kind = LinkKind::Demo;
    let mut link = settings.link.factory().open().ok().unwrap();
    assert!(link.query(Parameter::Rpm).unwrap().is_some());
    link.close();
}
