//! Angle Mapper
//!
//! Pure geometry for the gauge face. All angles use one convention: degrees,
//! 0° pointing right, positive turning clockwise on a y-down surface. Needle,
//! ticks and the redline arc all go through [`angle_for`] and [`polar`], so
//! they cannot drift apart.

use serde::{Deserialize, Serialize};

use super::{config::is_multiple, GaugeConfig, Point, MAX_TICKS};

/// Needle angle for `value`, clamped to the gauge range.
///
/// NaN reads as zero. A zero `max_value` maps everything to the start angle.
pub fn angle_for(value: f64, config: &GaugeConfig) -> f64 {
    let max = config.max_value.max(0.0);
    let clamped = if value.is_nan() { 0.0 } else { value.clamp(0.0, max) };
    let fraction = if max > 0.0 { clamped / max } else { 0.0 };
    config.start_angle_deg + fraction * (config.end_angle_deg - config.start_angle_deg)
}

/// Point at `radius` from `center` along `angle_deg`. A negative radius lands
/// on the opposite side (used for the needle tail).
pub fn polar(center: Point, radius: f64, angle_deg: f64) -> Point {
    let rad = angle_deg.to_radians();
    Point::new(center.x + radius * rad.cos(), center.y + radius * rad.sin())
}

/// One tick mark on the scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickMark {
    pub value: f64,
    pub angle: f64,
    pub major: bool,
}

/// Tick marks every `minor_tick_step` from 0 to `max_value` inclusive
pub fn tick_marks(config: &GaugeConfig) -> Vec<TickMark> {
    let step = config.minor_tick_step;
    if !(step > 0.0) || !(config.max_value > 0.0) {
        return Vec::new();
    }

    let count = ((config.max_value / step + 1e-9).floor() as usize).min(MAX_TICKS);
    (0..=count)
        .map(|i| {
            let value = i as f64 * step;
            TickMark {
                value,
                angle: angle_for(value, config),
                major: is_multiple(value, config.major_tick_step),
            }
        })
        .collect()
}

/// Angular span of an arc, `extent` measured clockwise from `start`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcSpan {
    pub start: f64,
    pub extent: f64,
}

impl ArcSpan {
    pub fn end(&self) -> f64 {
        self.start + self.extent
    }
}

/// Redline band: from `max_value - redline_window` to `max_value`
pub fn redline_span(config: &GaugeConfig) -> ArcSpan {
    let start = angle_for(config.max_value - config.redline_window, config);
    let end = angle_for(config.max_value, config);
    ArcSpan {
        start,
        extent: end - start,
    }
}
