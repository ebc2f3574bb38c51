//! Vehicle Link
//!
//! Everything the dashboard knows about the car goes through a [`VehicleLink`]:
//! an opaque handle that reports the connection status and answers single
//! parameter queries with either a [`Measurement`] or "no data".
//!
//! Two implementations ship with the crate:
//! - [`Elm327Link`]: ELM327-compatible adapters over a serial port or TCP (WiFi dongles)
//! - [`DemoLink`]: a simulated engine for running without a car

mod channel;
mod demo;
mod dtc;
mod elm327;
mod error;
mod pid;
pub mod serial;

pub use channel::{Channel, SerialChannel, TcpChannel};
pub use demo::{DemoFactory, DemoLink};
pub use dtc::{decode_dtc_response, Dtc, DtcSystem};
pub use elm327::{Elm327Factory, Elm327Link, Endpoint};
pub use error::LinkError;
pub use pid::Parameter;
pub use serial::{list_ports, PortInfo};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default baud rate for ELM327 adapters
pub const DEFAULT_BAUD_RATE: u32 = 38400;

/// Default timeout for a single adapter command in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Default address of WiFi ELM327 dongles
pub const DEFAULT_TCP_ADDRESS: &str = "192.168.0.10:35000";

/// Connection status reported by a vehicle link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No adapter answering
    NotConnected,
    /// Adapter answers but the vehicle bus is silent
    IgnitionOff,
    /// Adapter and vehicle ECU both answering
    CarConnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::NotConnected => "not connected",
            ConnectionState::IgnitionOff => "adapter connected, ignition off",
            ConnectionState::CarConnected => "car connected",
        };
        f.write_str(s)
    }
}

/// Physical unit of a measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    Rpm,
    Kph,
    Celsius,
    Percent,
    Kpa,
    Volts,
    GramsPerSecond,
    Degrees,
    Seconds,
}

impl Unit {
    /// Short display symbol
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Rpm => "rpm",
            Unit::Kph => "km/h",
            Unit::Celsius => "°C",
            Unit::Percent => "%",
            Unit::Kpa => "kPa",
            Unit::Volts => "V",
            Unit::GramsPerSecond => "g/s",
            Unit::Degrees => "°",
            Unit::Seconds => "s",
        }
    }
}

/// A single decoded sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub value: f64,
    pub unit: Unit,
}

impl Measurement {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} {}", self.value, self.unit.symbol())
    }
}

/// An open connection to the vehicle.
///
/// Calls may block for as long as the adapter takes to answer; implementations
/// are expected to bound that with their own timeout.
pub trait VehicleLink: Send {
    /// Probe adapter and vehicle
    fn status(&mut self) -> Result<ConnectionState, LinkError>;

    /// Read one parameter. `Ok(None)` means the sensor had nothing this cycle.
    fn query(&mut self, parameter: Parameter) -> Result<Option<Measurement>, LinkError>;

    /// Read stored diagnostic trouble codes (mode 03)
    fn read_dtcs(&mut self) -> Result<Vec<Dtc>, LinkError> {
        Err(LinkError::Unsupported("reading trouble codes"))
    }

    /// Clear stored trouble codes (mode 04)
    fn clear_dtcs(&mut self) -> Result<(), LinkError> {
        Err(LinkError::Unsupported("clearing trouble codes"))
    }

    /// Release the adapter. Further calls fail with [`LinkError::NotConnected`].
    fn close(&mut self);
}

/// Something that can open a fresh [`VehicleLink`]
pub trait LinkFactory: Send {
    fn open(&mut self) -> Result<Box<dyn VehicleLink>, LinkError>;
}

impl<F> LinkFactory for F
where
    F: FnMut() -> Result<Box<dyn VehicleLink>, LinkError> + Send,
{
    fn open(&mut self) -> Result<Box<dyn VehicleLink>, LinkError> {
        self()
    }
}
