//! ELM327 adapter driver
//!
//! Speaks the ELM327 AT command set over any [`Channel`]. Each command is a
//! line terminated by `\r`; the adapter answers with one or more lines and
//! then prints the `>` prompt.

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::{
    channel::{Channel, SerialChannel, TcpChannel},
    decode_dtc_response,
    dtc::hex_bytes,
    serial::{list_ports, open_port},
    ConnectionState, Dtc, LinkError, LinkFactory, Measurement, Parameter, VehicleLink,
};

const PROMPT: u8 = b'>';

/// Channel read timeout; the overall command deadline is enforced on top
const READ_SLICE: Duration = Duration::from_millis(50);

/// Commands sent after the reset, each must answer `OK`
const INIT_SEQUENCE: [&str; 5] = [
    "ATE0",  // echo off
    "ATL0",  // linefeeds off
    "ATS0",  // spaces off
    "ATH0",  // headers off
    "ATSP0", // automatic protocol
];

/// Where to find the adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// USB or Bluetooth serial adapter. `None` picks the first detected port.
    Serial { port: Option<String>, baud_rate: u32 },
    /// WiFi adapter
    Tcp { address: String },
}

/// A vehicle link through an ELM327-compatible adapter
pub struct Elm327Link {
    channel: Option<Box<dyn Channel>>,
    timeout: Duration,
    version: Option<String>,
}

impl Elm327Link {
    /// Wrap a channel without talking to the adapter yet
    pub fn new(channel: Box<dyn Channel>, timeout: Duration) -> Self {
        Self {
            channel: Some(channel),
            timeout,
            version: None,
        }
    }

    /// Wrap a channel and run the reset/initialisation sequence
    pub fn open(channel: Box<dyn Channel>, timeout: Duration) -> Result<Self, LinkError> {
        let mut link = Self::new(channel, timeout);
        link.initialize()
            .map_err(|e| LinkError::LinkUnavailable(e.to_string()))?;
        Ok(link)
    }

    /// Adapter identification from the reset banner (e.g. "ELM327V1.5")
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    fn initialize(&mut self) -> Result<(), LinkError> {
        if let Some(channel) = self.channel.as_mut() {
            channel.set_timeout(READ_SLICE)?;
        }

        let banner = self.send_command("ATZ")?;
        self.version = banner.iter().find(|l| l.starts_with("ELM")).cloned();

        for cmd in INIT_SEQUENCE {
            let lines = self.send_command(cmd)?;
            if !lines.iter().any(|l| l == "OK") {
                return Err(LinkError::InvalidResponse(format!(
                    "{}: {}",
                    cmd,
                    lines.join(" ")
                )));
            }
        }

        info!(version = ?self.version, "ELM327 adapter initialised");
        Ok(())
    }

    /// Send one command and collect the reply lines up to the prompt
    fn send_command(&mut self, cmd: &str) -> Result<Vec<String>, LinkError> {
        let timeout = self.timeout;
        let channel = self.channel.as_mut().ok_or(LinkError::NotConnected)?;

        channel.clear_input_buffer()?;
        debug!(command = cmd, "elm327 >>");
        channel.write_all(cmd.as_bytes())?;
        channel.write_all(b"\r")?;
        channel.flush()?;

        let deadline = Instant::now() + timeout;
        let mut raw = Vec::new();
        let mut buffer = [0u8; 256];

        while !raw.contains(&PROMPT) {
            if Instant::now() >= deadline {
                debug!(command = cmd, partial = ?String::from_utf8_lossy(&raw), "elm327 timeout");
                return Err(LinkError::Timeout);
            }
            match channel.read(&mut buffer) {
                Ok(0) => {
                    return Err(LinkError::IoError(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "adapter closed the connection",
                    )))
                }
                Ok(n) => raw.extend_from_slice(&buffer[..n]),
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut
                            | io::ErrorKind::WouldBlock
                            | io::ErrorKind::Interrupted
                    ) => {}
                Err(e) => return Err(e.into()),
            }
        }

        let lines = normalize_reply(&String::from_utf8_lossy(&raw), cmd);
        debug!(command = cmd, ?lines, "elm327 <<");
        Ok(lines)
    }
}

/// Split a raw reply into upper-cased lines without spaces, dropping the
/// prompt, the command echo and protocol-search chatter.
fn normalize_reply(text: &str, cmd: &str) -> Vec<String> {
    let echo: String = cmd.split_whitespace().collect::<String>().to_ascii_uppercase();
    text.split(['\r', '\n', '>'])
        .map(|line| {
            line.chars()
                .filter(|c| !c.is_whitespace() && *c != '\0')
                .collect::<String>()
                .to_ascii_uppercase()
        })
        .filter(|line| !line.is_empty() && *line != echo && !line.starts_with("SEARCHING"))
        .collect()
}

/// Replies meaning "nothing this time" rather than a broken link
fn is_transient_miss(line: &str) -> bool {
    matches!(line, "NODATA" | "?" | "STOPPED" | "CANERROR" | "BUFFERFULL")
}

/// Replies meaning the vehicle side stopped answering
fn is_bus_down(line: &str) -> bool {
    line == "UNABLETOCONNECT" || (line.starts_with("BUSINIT") && line.ends_with("ERROR"))
}

/// Interpret the reply to a mode 01 query
pub(crate) fn parse_query_response(
    parameter: Parameter,
    lines: &[String],
) -> Result<Option<Measurement>, LinkError> {
    let expected = format!("41{:02X}", parameter.pid());

    // CAN cars with several ECUs can answer twice; the first full answer wins
    for line in lines {
        if let Some(data) = line.strip_prefix(expected.as_str()) {
            let measurement = hex_bytes(data)
                .and_then(|bytes| parameter.decode(&bytes))
                .ok_or_else(|| LinkError::InvalidResponse(line.clone()))?;
            return Ok(Some(measurement));
        }
    }

    if lines.iter().any(|l| is_bus_down(l)) {
        return Err(LinkError::QueryFailed(format!(
            "vehicle bus not responding: {}",
            lines.join(" ")
        )));
    }
    if lines.iter().any(|l| is_transient_miss(l)) {
        return Ok(None);
    }
    Err(LinkError::InvalidResponse(lines.join(" ")))
}

fn query_error(e: LinkError) -> LinkError {
    match e {
        LinkError::NotConnected => LinkError::NotConnected,
        other => LinkError::QueryFailed(other.to_string()),
    }
}

impl VehicleLink for Elm327Link {
    fn status(&mut self) -> Result<ConnectionState, LinkError> {
        if self.channel.is_none() {
            return Ok(ConnectionState::NotConnected);
        }
        match self.send_command("0100") {
            Ok(lines) if lines.iter().any(|l| l.starts_with("4100")) => {
                Ok(ConnectionState::CarConnected)
            }
            // The adapter answered, the car did not
            Ok(_) => Ok(ConnectionState::IgnitionOff),
            Err(LinkError::Timeout) => Ok(ConnectionState::NotConnected),
            Err(e) => Err(e),
        }
    }

    fn query(&mut self, parameter: Parameter) -> Result<Option<Measurement>, LinkError> {
        let cmd = format!("01{:02X}", parameter.pid());
        let lines = self.send_command(&cmd).map_err(query_error)?;
        parse_query_response(parameter, &lines)
    }

    fn read_dtcs(&mut self) -> Result<Vec<Dtc>, LinkError> {
        let lines = self.send_command("03").map_err(query_error)?;
        decode_dtc_response(&lines)
    }

    fn clear_dtcs(&mut self) -> Result<(), LinkError> {
        let lines = self.send_command("04").map_err(query_error)?;
        if lines.iter().any(|l| l.starts_with("44")) {
            Ok(())
        } else {
            Err(LinkError::InvalidResponse(lines.join(" ")))
        }
    }

    fn close(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            // Protocol close; the adapter may already be gone
            let _ = channel.write_all(b"ATPC\r");
            let _ = channel.flush();
            info!("ELM327 link closed");
        }
    }
}

/// Opens [`Elm327Link`]s for the poller, one fresh channel per attempt
pub struct Elm327Factory {
    endpoint: Endpoint,
    timeout: Duration,
}

impl Elm327Factory {
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Self {
        Self { endpoint, timeout }
    }

    fn open_channel(&self) -> Result<Box<dyn Channel>, LinkError> {
        match &self.endpoint {
            Endpoint::Serial { port, baud_rate } => {
                let name = match port {
                    Some(p) => p.clone(),
                    None => list_ports()
                        .into_iter()
                        .next()
                        .map(|p| p.name)
                        .ok_or_else(|| LinkError::PortNotFound("no serial ports found".into()))?,
                };
                let port = open_port(&name, Some(*baud_rate))?;
                Ok(Box::new(SerialChannel::new(port)))
            }
            Endpoint::Tcp { address } => {
                let channel = TcpChannel::connect(address, self.timeout)?;
                Ok(Box::new(channel))
            }
        }
    }
}

impl LinkFactory for Elm327Factory {
    fn open(&mut self) -> Result<Box<dyn VehicleLink>, LinkError> {
        let channel = self
            .open_channel()
            .map_err(|e| LinkError::LinkUnavailable(e.to_string()))?;
        Ok(Box::new(Elm327Link::open(channel, self.timeout)?))
    }
}
