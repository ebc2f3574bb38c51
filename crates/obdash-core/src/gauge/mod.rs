//! Needle gauge
//!
//! - [`config`]: gauge configuration and its validation
//! - [`angle`]: value-to-angle mapping and face geometry
//! - [`draw`]: retained-mode primitives and surfaces
//! - [`renderer`]: static face plus the per-tick needle/readout/status redraw

pub mod angle;
pub mod config;
pub mod draw;
pub mod renderer;

pub use angle::{angle_for, polar, redline_span, tick_marks, ArcSpan, TickMark};
pub use config::{ConfigError, GaugeConfig, MAX_TICKS};
pub use draw::{Color, DrawSurface, LineCap, Point, Primitive, PrimitiveId, RecordingSurface};
pub use renderer::{
    format_thousands, readout_text, run_render_loop, GaugeRenderer, NeedleGeometry,
};
