//! Status Reporter
//!
//! Turns the connection part of a [`SampleState`] into the one-line status
//! shown under the gauge.

use serde::{Deserialize, Serialize};

use crate::gauge::Color;
use crate::link::ConnectionState;
use crate::sample::SampleState;

pub const CONNECTED_TEXT: &str = "Connected to vehicle";
pub const IGNITION_OFF_TEXT: &str = "Adapter connected, ignition off";
pub const DISCONNECTED_TEXT: &str = "Not connected… (check cable/ignition)";
pub const CONNECTING_TEXT: &str = "Connecting...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// Nothing heard from the poller yet
    Pending,
    Ok,
    Warning,
    Error,
}

/// Text and colour of the status line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusLine {
    pub text: String,
    pub color: Color,
    pub severity: Severity,
}

impl StatusLine {
    /// Shown before the poller has reported anything
    pub fn connecting() -> Self {
        Self::new(CONNECTING_TEXT, Color::rgb(0xdd, 0xdd, 0xdd), Severity::Pending)
    }

    pub fn connected() -> Self {
        Self::new(CONNECTED_TEXT, Color::rgb(0x99, 0xff, 0x99), Severity::Ok)
    }

    pub fn ignition_off() -> Self {
        Self::new(IGNITION_OFF_TEXT, Color::rgb(0xff, 0xcc, 0x66), Severity::Warning)
    }

    pub fn disconnected() -> Self {
        Self::new(DISCONNECTED_TEXT, Color::rgb(0xff, 0x99, 0x99), Severity::Error)
    }

    fn new(text: &str, color: Color, severity: Severity) -> Self {
        Self {
            text: text.to_string(),
            color,
            severity,
        }
    }

    /// Status for a snapshot; a store that was never written reads as "connecting"
    pub fn from_snapshot(snapshot: &SampleState) -> Self {
        if snapshot.sequence == 0 {
            return Self::connecting();
        }
        if snapshot.connected {
            return Self::connected();
        }
        match snapshot.link {
            ConnectionState::IgnitionOff => Self::ignition_off(),
            _ => Self::disconnected(),
        }
    }
}
