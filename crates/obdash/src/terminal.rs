//! Terminal display surface
//!
//! A terminal cannot show the needle, so geometry primitives are only counted.
//! Text replaced during a frame (the readout and status line) is reprinted in
//! place on one line, followed by the RPM trend when a history is attached.
//! When a speed source is attached, the latest speed and its trend follow.

use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};
use std::sync::Arc;

use obdash_core::gauge::{Color, DrawSurface, Primitive, PrimitiveId};
use obdash_core::history::LiveHistory;
use obdash_core::sample::SampleStore;

/// Top of the speed trend scale
pub const SPEED_FULL_SCALE_KPH: f64 = 200.0;

pub struct TerminalSurface<W: Write> {
    out: W,
    ansi: bool,
    texts: BTreeMap<PrimitiveId, (String, Color)>,
    shapes: BTreeSet<PrimitiveId>,
    next_id: u64,
    /// Texts added since the last present
    fresh: Vec<PrimitiveId>,
    replaced: bool,
    last_line: Option<String>,
    history: Option<(Arc<Mutex<LiveHistory>>, f64)>,
    speed: Option<SampleStore>,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W, ansi: bool) -> Self {
        Self {
            out,
            ansi,
            texts: BTreeMap::new(),
            shapes: BTreeSet::new(),
            next_id: 0,
            fresh: Vec::new(),
            replaced: false,
            last_line: None,
            history: None,
            speed: None,
        }
    }

    /// Append a sparkline of `history`, scaled to `full_scale`
    pub fn with_history(mut self, history: Arc<Mutex<LiveHistory>>, full_scale: f64) -> Self {
        self.history = Some((history, full_scale));
        self
    }

    /// Show the vehicle speed held in `store`
    pub fn with_speed(mut self, store: SampleStore) -> Self {
        self.speed = Some(store);
        self
    }

    /// Number of non-text primitives currently on the surface
    pub fn shapes(&self) -> usize {
        self.shapes.len()
    }

    /// The line printed for the last frame
    pub fn last_line(&self) -> Option<&str> {
        self.last_line.as_deref()
    }

    /// End the in-place line
    pub fn finish(&mut self) -> io::Result<()> {
        if self.last_line.is_some() {
            writeln!(self.out)?;
        }
        self.out.flush()
    }

    fn compose_line(&self) -> String {
        let mut line = self
            .fresh
            .iter()
            .filter_map(|id| self.texts.get(id))
            .map(|(text, color)| self.paint(text, *color))
            .collect::<Vec<_>>()
            .join("  |  ");

        let kph = self.speed.as_ref().and_then(|store| store.read().speed_kph);
        if let Some(kph) = kph {
            line.push_str(&format!("  |  {:.0} km/h", kph));
        }

        if let Some((history, full_scale)) = &self.history {
            let history = history.lock();
            let spark = history.sparkline(*full_scale);
            if !spark.is_empty() {
                line.push_str("  ");
                line.push_str(&spark);
            }
            if kph.is_some() {
                let spark = history.speed_sparkline(SPEED_FULL_SCALE_KPH);
                if !spark.is_empty() {
                    line.push_str("  ");
                    line.push_str(&spark);
                }
            }
        }
        line
    }

    fn paint(&self, text: &str, color: Color) -> String {
        if self.ansi {
            format!("\x1b[38;2;{};{};{}m{}\x1b[0m", color.r, color.g, color.b, text)
        } else {
            text.to_string()
        }
    }
}

impl<W: Write> DrawSurface for TerminalSurface<W> {
    fn add(&mut self, primitive: Primitive) -> PrimitiveId {
        let id = PrimitiveId(self.next_id);
        self.next_id += 1;
        match primitive {
            Primitive::Text { text, color, .. } => {
                self.texts.insert(id, (text, color));
                self.fresh.push(id);
            }
            _ => {
                self.shapes.insert(id);
            }
        }
        id
    }

    fn remove(&mut self, id: PrimitiveId) {
        if self.texts.remove(&id).is_some() {
            self.replaced = true;
        } else {
            self.shapes.remove(&id);
        }
    }

    fn present(&mut self) {
        // The first frame is the static face; nothing has been replaced yet
        if self.replaced {
            let line = self.compose_line();
            if self.last_line.as_deref() != Some(line.as_str()) {
                let clear = if self.ansi { "\x1b[2K" } else { "" };
                let written = write!(self.out, "\r{}{}", clear, line).and_then(|_| self.out.flush());
                if let Err(e) = written {
                    tracing::debug!(error = %e, "terminal write failed");
                }
                self.last_line = Some(line);
            }
        }
        self.fresh.clear();
        self.replaced = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obdash_core::gauge::{GaugeConfig, GaugeRenderer};
    use obdash_core::sample::SampleStore;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_prints_readout_and_status() {
        let surface = TerminalSurface::new(Vec::new(), false);
        let mut gauge = GaugeRenderer::new(GaugeConfig::default(), surface).unwrap();
        assert!(gauge.surface().last_line().is_none());

        let store = SampleStore::new();
        store.write(3250.0, true);
        gauge.tick(&store.read());

        assert_eq!(
            gauge.surface().last_line(),
            Some("3,250 RPM  |  Connected to vehicle")
        );
    }

    #[test]
    fn test_prints_speed_when_polled() {
        let store = SampleStore::new();
        let surface = TerminalSurface::new(Vec::new(), false).with_speed(store.clone());
        let mut gauge = GaugeRenderer::new(GaugeConfig::default(), surface).unwrap();

        store.write(2400.0, true);
        gauge.tick(&store.read());
        assert_eq!(
            gauge.surface().last_line(),
            Some("2,400 RPM  |  Connected to vehicle")
        );

        store.write_speed(55.0);
        gauge.tick(&store.read());
        assert_eq!(
            gauge.surface().last_line(),
            Some("2,400 RPM  |  Connected to vehicle  |  55 km/h")
        );
    }

    #[test]
    fn test_speed_trend_follows_rpm_trend() {
        let store = SampleStore::new();
        let history = Arc::new(Mutex::new(LiveHistory::new(5, std::time::Duration::ZERO)));
        let surface = TerminalSurface::new(Vec::new(), false)
            .with_history(history.clone(), 13000.0)
            .with_speed(store.clone());
        let mut gauge = GaugeRenderer::new(GaugeConfig::default(), surface).unwrap();

        store.write(13000.0, true);
        store.write_speed(200.0);
        history.lock().record(&store.read());
        gauge.tick(&store.read());

        assert_eq!(
            gauge.surface().last_line(),
            Some("13,000 RPM  |  Connected to vehicle  |  200 km/h  █  █")
        );
    }

    #[test]
    fn test_unchanged_frame_not_reprinted() {
        let surface = TerminalSurface::new(Vec::new(), false);
        let mut gauge = GaugeRenderer::new(GaugeConfig::default(), surface).unwrap();
        let store = SampleStore::new();
        store.write(1000.0, true);
        gauge.tick(&store.read());
        gauge.tick(&store.read());

        let out = String::from_utf8(gauge.into_surface().out).unwrap();
        assert_eq!(out.matches('\r').count(), 1);
    }

    #[test]
    fn test_shapes_stay_constant() {
        let surface = TerminalSurface::new(Vec::new(), false);
        let mut gauge = GaugeRenderer::new(GaugeConfig::default(), surface).unwrap();
        let before = gauge.surface().shapes();
        let store = SampleStore::new();
        for rpm in [800.0, 4000.0, 12000.0] {
            store.write(rpm, true);
            gauge.tick(&store.read());
        }
        assert_eq!(gauge.surface().shapes(), before);
    }
}
