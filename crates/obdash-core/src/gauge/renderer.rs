//! Gauge Renderer
//!
//! Draws the static face once, then on every tick replaces exactly three
//! primitives: the needle, the digital readout and the status line. The cost
//! of a frame does not depend on how many ticks or labels the face carries.

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::angle::{angle_for, polar, redline_span, tick_marks};
use super::{Color, ConfigError, DrawSurface, GaugeConfig, LineCap, Point, Primitive, PrimitiveId};
use crate::sample::{SampleState, SampleStore};
use crate::status::StatusLine;

const BEZEL: Color = Color::rgb(0x88, 0x88, 0x88);
const FACE: Color = Color::rgb(0x1b, 0x1b, 0x1b);
const MAJOR_TICK: Color = Color::rgb(0xdd, 0xdd, 0xdd);
const MINOR_TICK: Color = Color::rgb(0x77, 0x77, 0x77);
const LABEL: Color = Color::rgb(0xee, 0xee, 0xee);
const TITLE: Color = Color::rgb(0xdd, 0xdd, 0xdd);
const CAPTION: Color = Color::rgb(0xaa, 0xaa, 0xaa);
const REDLINE: Color = Color::rgb(0xcc, 0x33, 0x33);
const HUB_FILL: Color = Color::rgb(0xbb, 0xbb, 0xbb);
const HUB_OUTLINE: Color = Color::rgb(0x33, 0x33, 0x33);
const NEEDLE: Color = Color::rgb(0xee, 0x33, 0x33);
const READOUT: Color = Color::rgb(0xfa, 0xfa, 0xfa);

const HUB_RADIUS: f64 = 14.0;
/// Needle tail length behind the hub
const NEEDLE_BACK: f64 = 40.0;
/// Tip sits this far inside the bezel
const NEEDLE_TIP_INSET: f64 = 60.0;
const NEEDLE_WIDTH: f64 = 6.0;

/// Where the dynamic elements of the face sit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeedleGeometry {
    pub angle: f64,
    pub back: Point,
    pub tip: Point,
}

impl NeedleGeometry {
    pub fn for_value(value: f64, config: &GaugeConfig) -> Self {
        let angle = angle_for(value, config);
        Self {
            angle,
            back: polar(config.center, -NEEDLE_BACK, angle),
            tip: polar(config.center, config.radius - NEEDLE_TIP_INSET, angle),
        }
    }
}

/// `1234567` as `"1,234,567"`
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Readout text for a value; fractions are truncated
pub fn readout_text(value: f64) -> String {
    format!("{} RPM", format_thousands(value.trunc() as i64))
}

/// Renders one needle gauge onto a [`DrawSurface`]
pub struct GaugeRenderer<S: DrawSurface> {
    config: GaugeConfig,
    surface: S,
    needle: PrimitiveId,
    readout: PrimitiveId,
    status: PrimitiveId,
    static_count: usize,
    frames: u64,
}

impl<S: DrawSurface> GaugeRenderer<S> {
    /// Validate `config`, draw the face and show the needle at zero with a
    /// "connecting" status.
    pub fn new(config: GaugeConfig, mut surface: S) -> Result<Self, ConfigError> {
        config.validate()?;

        let static_count = draw_face(&config, &mut surface);
        let needle = surface.add(needle_primitive(0.0, &config));
        let readout = surface.add(readout_primitive(0.0, &config));
        let status = surface.add(status_primitive(&StatusLine::connecting(), &config));
        surface.present();

        debug!(static_count, "gauge face drawn");
        Ok(Self {
            config,
            surface,
            needle,
            readout,
            status,
            static_count,
            frames: 0,
        })
    }

    /// Redraw the dynamic elements for `snapshot`
    pub fn tick(&mut self, snapshot: &SampleState) {
        self.surface.remove(self.needle);
        self.surface.remove(self.readout);
        self.surface.remove(self.status);

        self.needle = self.surface.add(needle_primitive(snapshot.rpm, &self.config));
        self.readout = self.surface.add(readout_primitive(snapshot.rpm, &self.config));
        let line = StatusLine::from_snapshot(snapshot);
        self.status = self.surface.add(status_primitive(&line, &self.config));

        self.surface.present();
        self.frames += 1;
    }

    pub fn config(&self) -> &GaugeConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    /// Ids of needle, readout and status, in that order
    pub fn dynamic_ids(&self) -> [PrimitiveId; 3] {
        [self.needle, self.readout, self.status]
    }

    /// Number of primitives making up the static face
    pub fn static_count(&self) -> usize {
        self.static_count
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Tick the renderer from `store` every `refresh_interval` until `cancel`
/// fires. `on_frame` sees each snapshot after it was drawn. Returns the
/// number of frames drawn.
pub async fn run_render_loop<S, F>(
    renderer: &mut GaugeRenderer<S>,
    store: &SampleStore,
    cancel: CancellationToken,
    mut on_frame: F,
) -> u64
where
    S: DrawSurface,
    F: FnMut(&SampleState),
{
    let mut ticker = interval(renderer.config().refresh_interval());
    // A slow surface drops frames instead of bursting to catch up
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let start = renderer.frames();
    info!(period_ms = renderer.config().refresh_interval_ms, "render loop started");
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let snapshot = store.read();
                renderer.tick(&snapshot);
                on_frame(&snapshot);
            }
        }
    }

    let drawn = renderer.frames() - start;
    info!(frames = drawn, "render loop stopped");
    drawn
}

fn draw_face<S: DrawSurface>(config: &GaugeConfig, surface: &mut S) -> usize {
    let c = config.center;
    let r = config.radius;
    let mut count = 0;
    let mut add = |p: Primitive| {
        surface.add(p);
        count += 1;
    };

    add(Primitive::Oval {
        center: c,
        radius: r,
        fill: None,
        outline: Some(BEZEL),
        width: 6.0,
    });
    add(Primitive::Oval {
        center: c,
        radius: r - 15.0,
        fill: Some(FACE),
        outline: None,
        width: 0.0,
    });
    add(Primitive::Text {
        at: Point::new(c.x, c.y + r * 0.45),
        text: config.title.clone(),
        color: TITLE,
        size: 22.0,
        bold: true,
    });

    for tick in tick_marks(config) {
        let inner = if tick.major { r - 35.0 } else { r - 20.0 };
        add(Primitive::Line {
            from: polar(c, inner, tick.angle),
            to: polar(c, r - 5.0, tick.angle),
            color: if tick.major { MAJOR_TICK } else { MINOR_TICK },
            width: if tick.major { 4.0 } else { 2.0 },
            cap: LineCap::Butt,
        });
        if tick.major {
            add(Primitive::Text {
                at: polar(c, r - 70.0, tick.angle),
                text: format!("{}", (tick.value / config.label_divisor).floor() as i64),
                color: LABEL,
                size: 18.0,
                bold: true,
            });
        }
    }

    if config.redline_window > 0.0 {
        add(Primitive::Arc {
            center: c,
            radius: r - 10.0,
            span: redline_span(config),
            color: REDLINE,
            width: 10.0,
        });
    }

    add(Primitive::Text {
        at: Point::new(c.x, c.y + r * 0.33),
        text: config.unit_caption.clone(),
        color: CAPTION,
        size: 14.0,
        bold: false,
    });
    add(Primitive::Oval {
        center: c,
        radius: HUB_RADIUS,
        fill: Some(HUB_FILL),
        outline: Some(HUB_OUTLINE),
        width: 2.0,
    });

    count
}

fn needle_primitive(value: f64, config: &GaugeConfig) -> Primitive {
    let geometry = NeedleGeometry::for_value(value, config);
    Primitive::Line {
        from: geometry.back,
        to: geometry.tip,
        color: NEEDLE,
        width: NEEDLE_WIDTH,
        cap: LineCap::Round,
    }
}

fn readout_primitive(value: f64, config: &GaugeConfig) -> Primitive {
    Primitive::Text {
        at: Point::new(config.center.x, config.center.y + config.radius * 0.58),
        text: readout_text(value),
        color: READOUT,
        size: 28.0,
        bold: true,
    }
}

fn status_primitive(line: &StatusLine, config: &GaugeConfig) -> Primitive {
    Primitive::Text {
        at: Point::new(config.center.x, config.center.y + config.radius + 60.0),
        text: line.text.clone(),
        color: line.color,
        size: 12.0,
        bold: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(13000), "13,000");
        assert_eq!(format_thousands(1234567), "1,234,567");
        assert_eq!(format_thousands(-4500), "-4,500");
    }

    #[test]
    fn test_readout_truncates() {
        assert_eq!(readout_text(3499.9), "3,499 RPM");
        assert_eq!(readout_text(0.0), "0 RPM");
    }
}
