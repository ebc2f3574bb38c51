//! # obdash Core Library
//!
//! Core functionality for the obdash OBD-II RPM gauge.
//!
//! This library provides:
//! - Vehicle links: ELM327 adapters over serial or TCP, plus a simulated engine
//! - A background poller that keeps a single latest-sample slot up to date
//! - Needle gauge geometry and a retained-mode renderer with O(1) frames
//! - Diagnostic trouble code reading and clearing
//! - JSON settings
//!
//! ## Example
//!
//! ```rust,ignore
//! use obdash_core::prelude::*;
//!
//! let settings = Settings::load_or_default("obdash.json")?;
//! let store = SampleStore::new();
//!
//! let poller = Poller::new(
//!     settings.link.factory(),
//!     store.clone(),
//!     PollerConfig::from_settings(&settings.poller, settings.gauge.poll_interval_ms),
//! )
//! .spawn()?;
//!
//! let mut gauge = GaugeRenderer::new(settings.gauge.clone(), RecordingSurface::new())?;
//! gauge.tick(&store.read());
//!
//! poller.stop().ok();
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod gauge;
pub mod history;
pub mod link;
pub mod poller;
pub mod sample;
pub mod settings;
pub mod status;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::gauge::{
        angle_for, polar, run_render_loop, ConfigError, DrawSurface, GaugeConfig, GaugeRenderer,
        Point, Primitive, RecordingSurface,
    };
    pub use crate::history::LiveHistory;
    pub use crate::link::{
        ConnectionState, Dtc, LinkError, LinkFactory, Measurement, Parameter, VehicleLink,
    };
    pub use crate::poller::{Poller, PollerConfig, PollerHandle, PollerState};
    pub use crate::sample::{SampleState, SampleStore};
    pub use crate::settings::{LinkKind, Settings, SettingsError};
    pub use crate::status::StatusLine;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
