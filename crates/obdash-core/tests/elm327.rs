//! ELM327 driver tests against a scripted in-memory adapter

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::collections::{HashMap, VecDeque};
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::Duration;

use obdash_core::link::{
    Channel, ConnectionState, Elm327Link, LinkError, Parameter, Unit, VehicleLink,
};

/// Answers each `\r`-terminated command from a table; unknown commands get `?`.
/// A command mapped to `None` is never answered.
#[derive(Clone, Default)]
struct ScriptedAdapter {
    replies: Arc<Mutex<HashMap<String, Option<String>>>>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl ScriptedAdapter {
    fn new() -> Self {
        let adapter = Self::default();
        adapter.reply("ATZ", "ATZ\r\r\rELM327 v1.5\r\r>");
        adapter.reply("ATE0", "ATE0\rOK\r\r>");
        for cmd in ["ATL0", "ATS0", "ATH0", "ATSP0"] {
            adapter.reply(cmd, "OK\r\r>");
        }
        adapter.reply("0100", "SEARCHING...\r41 00 BE 3E B8 11\r\r>");
        adapter
    }

    fn reply(&self, cmd: &str, text: &str) {
        self.replies.lock().insert(cmd.to_string(), Some(text.to_string()));
    }

    fn silence(&self, cmd: &str) {
        self.replies.lock().insert(cmd.to_string(), None);
    }

    fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    fn channel(&self) -> Box<dyn Channel> {
        Box::new(MockChannel {
            adapter: self.clone(),
            line: Vec::new(),
            pending: VecDeque::new(),
        })
    }
}

struct MockChannel {
    adapter: ScriptedAdapter,
    line: Vec<u8>,
    pending: VecDeque<u8>,
}

impl Read for MockChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            std::thread::sleep(Duration::from_millis(1));
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
        }
        let n = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for MockChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &byte in buf {
            if byte == b'\r' {
                let cmd = String::from_utf8_lossy(&self.line).to_string();
                self.line.clear();
                self.adapter.sent.lock().push(cmd.clone());
                let reply = self
                    .adapter
                    .replies
                    .lock()
                    .get(&cmd)
                    .cloned()
                    .unwrap_or_else(|| Some("?\r\r>".to_string()));
                if let Some(text) = reply {
                    self.pending.extend(text.bytes());
                }
            } else {
                self.line.push(byte);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Channel for MockChannel {
    fn set_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        self.pending.clear();
        Ok(())
    }
}

fn open(adapter: &ScriptedAdapter) -> Elm327Link {
    Elm327Link::open(adapter.channel(), Duration::from_millis(200)).unwrap()
}

#[test]
fn test_init_sequence() {
    let adapter = ScriptedAdapter::new();
    let link = open(&adapter);

    assert_eq!(
        adapter.sent(),
        vec!["ATZ", "ATE0", "ATL0", "ATS0", "ATH0", "ATSP0"]
    );
    assert_eq!(link.version(), Some("ELM327V1.5"));
}

#[test]
fn test_init_failure_is_link_unavailable() {
    let adapter = ScriptedAdapter::new();
    adapter.reply("ATSP0", "?\r\r>");
    let err = Elm327Link::open(adapter.channel(), Duration::from_millis(200)).err().unwrap();
    assert!(matches!(err, LinkError::LinkUnavailable(_)), "{:?}", err);
}

#[test]
fn test_silent_adapter_is_link_unavailable() {
    let adapter = ScriptedAdapter::new();
    adapter.silence("ATZ");
    let err = Elm327Link::open(adapter.channel(), Duration::from_millis(50)).err().unwrap();
    assert!(matches!(err, LinkError::LinkUnavailable(_)));
}

#[test]
fn test_status_states() {
    let adapter = ScriptedAdapter::new();
    let mut link = open(&adapter);
    assert_eq!(link.status().unwrap(), ConnectionState::CarConnected);

    adapter.reply("0100", "SEARCHING...\rUNABLE TO CONNECT\r\r>");
    assert_eq!(link.status().unwrap(), ConnectionState::IgnitionOff);

    adapter.silence("0100");
    assert_eq!(link.status().unwrap(), ConnectionState::NotConnected);
}

#[test]
fn test_query_rpm() {
    let adapter = ScriptedAdapter::new();
    adapter.reply("010C", "41 0C 1A F8\r\r>");
    let mut link = open(&adapter);

    let m = link.query(Parameter::Rpm).unwrap().unwrap();
    assert_eq!(m.value, 1726.0);
    assert_eq!(m.unit, Unit::Rpm);
}

#[test]
fn test_query_no_data() {
    let adapter = ScriptedAdapter::new();
    adapter.reply("010C", "NO DATA\r\r>");
    let mut link = open(&adapter);
    assert_eq!(link.query(Parameter::Rpm).unwrap(), None);
}

#[test]
fn test_query_timeout_is_query_failed() {
    let adapter = ScriptedAdapter::new();
    adapter.silence("010D");
    let mut link = open(&adapter);
    let err = link.query(Parameter::Speed).unwrap_err();
    assert!(matches!(err, LinkError::QueryFailed(_)));
    assert!(err.is_link_failure());
}

#[test]
fn test_query_garbage_is_not_link_failure() {
    let adapter = ScriptedAdapter::new();
    adapter.reply("010C", "41 0D 20\r\r>");
    let mut link = open(&adapter);
    let err = link.query(Parameter::Rpm).unwrap_err();
    assert!(!err.is_link_failure());
}

#[test]
fn test_read_and_clear_dtcs() {
    let adapter = ScriptedAdapter::new();
    adapter.reply("03", "43 01 33 00 00 00 00\r\r>");
    adapter.reply("04", "44\r\r>");
    let mut link = open(&adapter);

    let codes: Vec<String> = link.read_dtcs().unwrap().iter().map(|c| c.to_string()).collect();
    assert_eq!(codes, vec!["P0133"]);
    link.clear_dtcs().unwrap();
}

#[test]
fn test_close_sends_protocol_close_once() {
    let adapter = ScriptedAdapter::new();
    let mut link = open(&adapter);
    link.close();
    link.close();

    let closes = adapter.sent().iter().filter(|c| *c == "ATPC").count();
    assert_eq!(closes, 1);
    assert_eq!(link.status().unwrap(), ConnectionState::NotConnected);
    assert!(matches!(
        link.query(Parameter::Rpm),
        Err(LinkError::NotConnected)
    ));
}
