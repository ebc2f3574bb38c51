//! Gauge configuration
//!
//! Fixed at construction; the renderer refuses configurations that would
//! produce degenerate geometry.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use super::Point;

/// Upper bound on minor ticks drawn on the face
pub const MAX_TICKS: usize = 1000;

/// Rejected gauge configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("max_value must be positive, got {0}")]
    NonPositiveMax(f64),

    #[error("radius must be positive, got {0}")]
    NonPositiveRadius(f64),

    #[error("end angle {end} must be greater than start angle {start}")]
    EmptySweep { start: f64, end: f64 },

    #[error("tick steps must be positive with major a multiple of minor (major {major}, minor {minor})")]
    InvalidTickSteps { major: f64, minor: f64 },

    #[error("{count} ticks exceed the limit of {limit}")]
    TooManyTicks { count: f64, limit: usize },

    #[error("redline window {window} must lie within 0..={max}")]
    InvalidRedline { window: f64, max: f64 },

    #[error("{0} must be at least 1 ms")]
    ZeroInterval(&'static str),

    #[error("label divisor must be positive, got {0}")]
    InvalidLabelDivisor(f64),
}

/// Configuration of the needle gauge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaugeConfig {
    /// Full-scale value
    pub max_value: f64,
    /// Needle angle at zero, in degrees (0° = right, clockwise positive)
    pub start_angle_deg: f64,
    /// Needle angle at full scale
    pub end_angle_deg: f64,
    /// Bezel radius in pixels
    pub radius: f64,
    /// Gauge centre in surface coordinates
    pub center: Point,
    pub major_tick_step: f64,
    pub minor_tick_step: f64,
    /// Width of the red band below `max_value`
    pub redline_window: f64,
    /// Render tick period
    pub refresh_interval_ms: u64,
    /// Poller query period
    pub poll_interval_ms: u64,
    /// Face title
    pub title: String,
    /// Caption under the title (scale of the tick labels)
    pub unit_caption: String,
    /// Tick labels print `value / label_divisor`
    pub label_divisor: f64,
}

impl Default for GaugeConfig {
    fn default() -> Self {
        Self {
            max_value: 13000.0,
            start_angle_deg: -120.0,
            end_angle_deg: 120.0,
            radius: 300.0,
            center: Point::new(400.0, 400.0),
            major_tick_step: 1000.0,
            minor_tick_step: 500.0,
            redline_window: 1000.0,
            refresh_interval_ms: 5,
            poll_interval_ms: 100,
            title: "ENGINE RPM".to_string(),
            unit_caption: "x1000 r/min".to_string(),
            label_divisor: 1000.0,
        }
    }
}

impl GaugeConfig {
    /// Check the configuration, returning it unchanged when usable
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_value > 0.0 && self.max_value.is_finite()) {
            return Err(ConfigError::NonPositiveMax(self.max_value));
        }
        if !(self.radius > 0.0 && self.radius.is_finite()) {
            return Err(ConfigError::NonPositiveRadius(self.radius));
        }
        if !(self.end_angle_deg > self.start_angle_deg) {
            return Err(ConfigError::EmptySweep {
                start: self.start_angle_deg,
                end: self.end_angle_deg,
            });
        }
        let steps_ok = self.minor_tick_step > 0.0
            && self.major_tick_step >= self.minor_tick_step
            && is_multiple(self.major_tick_step, self.minor_tick_step);
        if !steps_ok {
            return Err(ConfigError::InvalidTickSteps {
                major: self.major_tick_step,
                minor: self.minor_tick_step,
            });
        }
        let count = self.max_value / self.minor_tick_step;
        if !(count <= MAX_TICKS as f64) {
            return Err(ConfigError::TooManyTicks {
                count,
                limit: MAX_TICKS,
            });
        }
        if !(0.0..=self.max_value).contains(&self.redline_window) {
            return Err(ConfigError::InvalidRedline {
                window: self.redline_window,
                max: self.max_value,
            });
        }
        if self.refresh_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval("refresh_interval_ms"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval("poll_interval_ms"));
        }
        if !(self.label_divisor > 0.0) {
            return Err(ConfigError::InvalidLabelDivisor(self.label_divisor));
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// `value` is a whole multiple of `step`, within float noise
pub(crate) fn is_multiple(value: f64, step: f64) -> bool {
    if step <= 0.0 {
        return false;
    }
    let ratio = value / step;
    (ratio - ratio.round()).abs() < 1e-6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(GaugeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_max() {
        let config = GaugeConfig {
            max_value: 0.0,
            ..GaugeConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NonPositiveMax(0.0)));
    }

    #[test]
    fn test_rejects_reversed_sweep() {
        let config = GaugeConfig {
            start_angle_deg: 90.0,
            end_angle_deg: -90.0,
            ..GaugeConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptySweep { .. })));
    }

    #[test]
    fn test_rejects_misaligned_ticks() {
        let config = GaugeConfig {
            major_tick_step: 1000.0,
            minor_tick_step: 300.0,
            ..GaugeConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTickSteps { .. })));
    }

    #[test]
    fn test_rejects_tick_flood() {
        for step in [1e-300, 0.01, 12.0] {
            let config = GaugeConfig {
                major_tick_step: step,
                minor_tick_step: step,
                ..GaugeConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(ConfigError::TooManyTicks { .. })),
                "step {} accepted",
                step
            );
        }
        let config = GaugeConfig {
            major_tick_step: 13.0,
            minor_tick_step: 13.0,
            ..GaugeConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_oversized_redline() {
        let config = GaugeConfig {
            redline_window: 20000.0,
            ..GaugeConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRedline { .. })));
    }

    #[test]
    fn test_rejects_zero_refresh() {
        let config = GaugeConfig {
            refresh_interval_ms: 0,
            ..GaugeConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroInterval("refresh_interval_ms"))
        );
    }
}
