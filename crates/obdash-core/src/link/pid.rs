//! Mode 01 parameter identifiers and their decoders

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Measurement, Unit};

/// Live-data parameters the dashboard knows how to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Parameter {
    EngineLoad,
    CoolantTemp,
    IntakePressure,
    Rpm,
    Speed,
    TimingAdvance,
    IntakeTemp,
    MafRate,
    ThrottlePosition,
    RunTime,
    FuelLevel,
    ControlModuleVoltage,
}

impl Parameter {
    /// Every parameter, in PID order
    pub const ALL: [Parameter; 12] = [
        Parameter::EngineLoad,
        Parameter::CoolantTemp,
        Parameter::IntakePressure,
        Parameter::Rpm,
        Parameter::Speed,
        Parameter::TimingAdvance,
        Parameter::IntakeTemp,
        Parameter::MafRate,
        Parameter::ThrottlePosition,
        Parameter::RunTime,
        Parameter::FuelLevel,
        Parameter::ControlModuleVoltage,
    ];

    /// Mode 01 PID byte
    pub fn pid(self) -> u8 {
        match self {
            Parameter::EngineLoad => 0x04,
            Parameter::CoolantTemp => 0x05,
            Parameter::IntakePressure => 0x0B,
            Parameter::Rpm => 0x0C,
            Parameter::Speed => 0x0D,
            Parameter::TimingAdvance => 0x0E,
            Parameter::IntakeTemp => 0x0F,
            Parameter::MafRate => 0x10,
            Parameter::ThrottlePosition => 0x11,
            Parameter::RunTime => 0x1F,
            Parameter::FuelLevel => 0x2F,
            Parameter::ControlModuleVoltage => 0x42,
        }
    }

    /// Upper-case name, as printed in reports
    pub fn name(self) -> &'static str {
        match self {
            Parameter::EngineLoad => "ENGINE_LOAD",
            Parameter::CoolantTemp => "COOLANT_TEMP",
            Parameter::IntakePressure => "INTAKE_PRESSURE",
            Parameter::Rpm => "RPM",
            Parameter::Speed => "SPEED",
            Parameter::TimingAdvance => "TIMING_ADVANCE",
            Parameter::IntakeTemp => "INTAKE_TEMP",
            Parameter::MafRate => "MAF",
            Parameter::ThrottlePosition => "THROTTLE_POS",
            Parameter::RunTime => "RUN_TIME",
            Parameter::FuelLevel => "FUEL_LEVEL",
            Parameter::ControlModuleVoltage => "CONTROL_MODULE_VOLTAGE",
        }
    }

    pub fn unit(self) -> Unit {
        match self {
            Parameter::EngineLoad | Parameter::ThrottlePosition | Parameter::FuelLevel => {
                Unit::Percent
            }
            Parameter::CoolantTemp | Parameter::IntakeTemp => Unit::Celsius,
            Parameter::IntakePressure => Unit::Kpa,
            Parameter::Rpm => Unit::Rpm,
            Parameter::Speed => Unit::Kph,
            Parameter::TimingAdvance => Unit::Degrees,
            Parameter::MafRate => Unit::GramsPerSecond,
            Parameter::RunTime => Unit::Seconds,
            Parameter::ControlModuleVoltage => Unit::Volts,
        }
    }

    /// Number of data bytes in a response
    pub fn data_len(self) -> usize {
        match self {
            Parameter::Rpm
            | Parameter::MafRate
            | Parameter::RunTime
            | Parameter::ControlModuleVoltage => 2,
            _ => 1,
        }
    }

    /// Look a parameter up by its report name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Parameter> {
        Parameter::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
    }

    /// Decode the data bytes following `41 <pid>`
    pub fn decode(self, data: &[u8]) -> Option<Measurement> {
        if data.len() < self.data_len() {
            return None;
        }
        let a = data[0] as f64;
        let b = data.get(1).copied().unwrap_or(0) as f64;

        let value = match self {
            Parameter::EngineLoad | Parameter::ThrottlePosition | Parameter::FuelLevel => {
                a * 100.0 / 255.0
            }
            Parameter::CoolantTemp | Parameter::IntakeTemp => a - 40.0,
            Parameter::IntakePressure | Parameter::Speed => a,
            Parameter::Rpm => (a * 256.0 + b) / 4.0,
            Parameter::TimingAdvance => a / 2.0 - 64.0,
            Parameter::MafRate => (a * 256.0 + b) / 100.0,
            Parameter::RunTime => a * 256.0 + b,
            Parameter::ControlModuleVoltage => (a * 256.0 + b) / 1000.0,
        };

        Some(Measurement::new(value, self.unit()))
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
