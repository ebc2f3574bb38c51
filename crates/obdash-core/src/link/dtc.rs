//! Diagnostic trouble codes (mode 03 / 04)
//!
//! Codes are decoded to their five-character form (`P0301`). Descriptions are
//! not part of this crate.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::LinkError;

/// Vehicle system a trouble code belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DtcSystem {
    Powertrain,
    Chassis,
    Body,
    Network,
}

impl DtcSystem {
    fn letter(self) -> char {
        match self {
            DtcSystem::Powertrain => 'P',
            DtcSystem::Chassis => 'C',
            DtcSystem::Body => 'B',
            DtcSystem::Network => 'U',
        }
    }
}

/// A stored trouble code, kept as the two raw bytes the ECU sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dtc {
    raw: u16,
}

impl Dtc {
    pub fn from_bytes(a: u8, b: u8) -> Self {
        Self {
            raw: u16::from_be_bytes([a, b]),
        }
    }

    /// Parse the printed form, e.g. `P0301` or `u1a2b`
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let mut chars = s.chars();
        let system_bits: u16 = match chars.next()?.to_ascii_uppercase() {
            'P' => 0,
            'C' => 1,
            'B' => 2,
            'U' => 3,
            _ => return None,
        };
        let rest = chars.as_str();
        if !rest.is_ascii() || rest.len() != 4 {
            return None;
        }
        let first = rest[..1].parse::<u16>().ok().filter(|d| *d <= 3)?;
        let tail = u16::from_str_radix(&rest[1..], 16).ok()?;
        Some(Self {
            raw: (system_bits << 14) | (first << 12) | tail,
        })
    }

    pub fn system(&self) -> DtcSystem {
        match self.raw >> 14 {
            0 => DtcSystem::Powertrain,
            1 => DtcSystem::Chassis,
            2 => DtcSystem::Body,
            _ => DtcSystem::Network,
        }
    }

    pub fn raw(&self) -> u16 {
        self.raw
    }
}

impl fmt::Display for Dtc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{:03X}",
            self.system().letter(),
            (self.raw >> 12) & 0x3,
            self.raw & 0x0FFF
        )
    }
}

pub(super) fn hex_bytes(s: &str) -> Option<Vec<u8>> {
    if !s.is_ascii() || s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

/// Split adapter lines into messages.
///
/// CAN multi-frame replies arrive as a length header line (`00A`) followed
/// by numbered frames (`0:4304...`, `1:...`); those are merged and cut to the
/// announced length. Every other line is a message of its own.
fn collect_messages(lines: &[String]) -> Vec<String> {
    let mut messages = Vec::new();
    let mut frames = String::new();
    let mut announced: Option<usize> = None;

    for line in lines {
        if line.len() == 3 && line.chars().all(|c| c.is_ascii_hexdigit()) {
            announced = usize::from_str_radix(line, 16).ok();
            continue;
        }
        if let Some((index, data)) = line.split_once(':') {
            if index.chars().all(|c| c.is_ascii_hexdigit()) {
                frames.push_str(data);
                continue;
            }
        }
        messages.push(line.clone());
    }

    if !frames.is_empty() {
        if let Some(len) = announced {
            frames.truncate(len * 2);
        }
        messages.push(frames);
    }
    messages
}

/// Decode a mode 03 reply (already stripped of spaces and upper-cased).
///
/// Legacy protocols send fixed six-byte frames after `43`; CAN inserts a
/// count byte, which leaves an odd number of data bytes and is skipped.
/// `0000` padding pairs are ignored.
pub fn decode_dtc_response(lines: &[String]) -> Result<Vec<Dtc>, LinkError> {
    let mut codes = Vec::new();
    let mut saw_reply = false;

    for message in collect_messages(lines) {
        if message == "NODATA" {
            saw_reply = true;
            continue;
        }
        let bytes = hex_bytes(&message)
            .ok_or_else(|| LinkError::InvalidResponse(message.clone()))?;
        let Some((&0x43, data)) = bytes.split_first() else {
            continue;
        };
        saw_reply = true;

        let data = if data.len() % 2 == 1 { &data[1..] } else { data };
        for pair in data.chunks_exact(2) {
            if pair[0] == 0 && pair[1] == 0 {
                continue;
            }
            let dtc = Dtc::from_bytes(pair[0], pair[1]);
            if !codes.contains(&dtc) {
                codes.push(dtc);
            }
        }
    }

    if !saw_reply {
        return Err(LinkError::InvalidResponse(lines.join(" ")));
    }
    Ok(codes)
}
