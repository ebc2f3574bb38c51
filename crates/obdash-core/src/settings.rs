//! Dashboard settings
//!
//! One JSON document with a section per component. Every field has a default,
//! so a partial (or missing) file is fine; the gauge section is validated on
//! load because a bad gauge configuration is refused at construction anyway.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::gauge::{ConfigError, GaugeConfig};
use crate::link::{
    DemoFactory, Elm327Factory, Endpoint, LinkFactory, DEFAULT_BAUD_RATE, DEFAULT_TCP_ADDRESS,
    DEFAULT_TIMEOUT_MS,
};

/// Errors loading or saving settings
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid gauge configuration: {0}")]
    Invalid(#[from] ConfigError),

    #[error("Invalid poller settings: {0} must be at least 1 ms")]
    ZeroBackoff(&'static str),
}

/// Which kind of adapter to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    #[default]
    Serial,
    Tcp,
    Demo,
}

/// Adapter connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSettings {
    pub kind: LinkKind,
    /// Serial port name; `None` picks the first detected port
    pub port: Option<String>,
    pub baud_rate: u32,
    /// `host:port` of a WiFi adapter
    pub address: String,
    /// Per-command adapter timeout
    pub timeout_ms: u64,
    /// Demo link only: fail every Nth query (`0` never)
    pub demo_fail_every: u64,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            kind: LinkKind::default(),
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            address: DEFAULT_TCP_ADDRESS.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            demo_fail_every: 0,
        }
    }
}

impl LinkSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Factory that opens links as configured
    pub fn factory(&self) -> Box<dyn LinkFactory> {
        match self.kind {
            LinkKind::Serial => Box::new(Elm327Factory::new(
                Endpoint::Serial {
                    port: self.port.clone(),
                    baud_rate: self.baud_rate,
                },
                self.timeout(),
            )),
            LinkKind::Tcp => Box::new(Elm327Factory::new(
                Endpoint::Tcp {
                    address: self.address.clone(),
                },
                self.timeout(),
            )),
            LinkKind::Demo => Box::new(DemoFactory::new(self.demo_fail_every)),
        }
    }
}

/// Poller backoffs. The poll period itself lives in [`GaugeConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerSettings {
    pub reconnect_backoff_ms: u64,
    pub probe_backoff_ms: u64,
    pub failure_backoff_ms: u64,
    /// Also poll vehicle speed each cycle
    pub poll_speed: bool,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            reconnect_backoff_ms: 1000,
            probe_backoff_ms: 1000,
            failure_backoff_ms: 2000,
            poll_speed: false,
        }
    }
}

impl PollerSettings {
    /// Every backoff must be at least 1 ms
    pub fn validate(&self) -> Result<(), SettingsError> {
        let backoffs = [
            ("reconnect_backoff_ms", self.reconnect_backoff_ms),
            ("probe_backoff_ms", self.probe_backoff_ms),
            ("failure_backoff_ms", self.failure_backoff_ms),
        ];
        match backoffs.iter().find(|(_, ms)| *ms == 0) {
            Some((name, _)) => Err(SettingsError::ZeroBackoff(name)),
            None => Ok(()),
        }
    }
}

/// Live history panel settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Points kept per series
    pub capacity: usize,
    /// Minimum spacing between recorded points
    pub sample_interval_ms: u64,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            capacity: 30,
            sample_interval_ms: 1000,
        }
    }
}

/// All dashboard settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub link: LinkSettings,
    pub poller: PollerSettings,
    pub gauge: GaugeConfig,
    pub history: HistorySettings,
}

impl Settings {
    /// Load from a JSON file and validate
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load from a JSON file, or fall back to defaults when it does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_json(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_json(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(content)?;
        settings.gauge.validate()?;
        settings.poller.validate()?;
        Ok(settings)
    }

    /// Write as pretty-printed JSON, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
