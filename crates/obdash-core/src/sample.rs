//! Sample Store
//!
//! The single slot shared by the poller (writer) and the renderer (reader).
//! Every write replaces the whole [`SampleState`] under one short lock, and
//! every read copies the whole record out, so a reader sees either the
//! previous snapshot or a newer one, never a mix of the two.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

use crate::link::ConnectionState;

/// Latest known engine state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleState {
    /// Most recent good RPM reading, `0.0` before the first one
    pub rpm: f64,
    /// Whether the last poll cycle reached the vehicle
    pub connected: bool,
    /// Link status as last seen by the poller
    pub link: ConnectionState,
    /// Most recent vehicle speed, when speed polling is enabled
    pub speed_kph: Option<f64>,
    /// Time of the last write
    pub last_update: Instant,
    /// Incremented on every write
    pub sequence: u64,
}

impl Default for SampleState {
    fn default() -> Self {
        Self {
            rpm: 0.0,
            connected: false,
            link: ConnectionState::NotConnected,
            speed_kph: None,
            last_update: Instant::now(),
            sequence: 0,
        }
    }
}

fn is_valid_reading(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// Cheap-to-clone handle to the shared slot
#[derive(Debug, Clone, Default)]
pub struct SampleStore {
    slot: Arc<Mutex<SampleState>>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consistent copy of the current snapshot
    pub fn read(&self) -> SampleState {
        *self.slot.lock()
    }

    /// Store a new RPM reading together with the liveness flag.
    ///
    /// NaN, infinite and negative readings are dropped; the flag still applies.
    pub fn write(&self, rpm: f64, connected: bool) {
        if !is_valid_reading(rpm) {
            tracing::warn!(rpm, "discarding invalid rpm reading");
        }
        self.update(|s| {
            if is_valid_reading(rpm) {
                s.rpm = rpm;
            }
            s.connected = connected;
            if connected {
                s.link = ConnectionState::CarConnected;
            }
        });
    }

    /// Vehicle answered but had no new RPM; keep the old value
    pub fn mark_connected(&self) {
        self.update(|s| {
            s.connected = true;
            s.link = ConnectionState::CarConnected;
        });
    }

    /// Link lost or vehicle silent; the RPM is left as-is (stale)
    pub fn mark_disconnected(&self, link: ConnectionState) {
        self.update(|s| {
            s.connected = false;
            s.link = link;
        });
    }

    /// Store a new vehicle speed reading
    pub fn write_speed(&self, kph: f64) {
        if !is_valid_reading(kph) {
            tracing::warn!(kph, "discarding invalid speed reading");
            return;
        }
        self.update(|s| s.speed_kph = Some(kph));
    }

    fn update(&self, f: impl FnOnce(&mut SampleState)) {
        let mut slot = self.slot.lock();
        f(&mut slot);
        slot.sequence = slot.sequence.wrapping_add(1);
        slot.last_update = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let store = SampleStore::new();
        let s = store.read();
        assert_eq!(s.rpm, 0.0);
        assert!(!s.connected);
        assert_eq!(s.link, ConnectionState::NotConnected);
        assert_eq!(s.sequence, 0);
    }

    #[test]
    fn test_invalid_rpm_keeps_previous() {
        let store = SampleStore::new();
        store.write(2500.0, true);
        store.write(f64::NAN, true);
        store.write(-10.0, true);
        store.write(f64::INFINITY, true);
        assert_eq!(store.read().rpm, 2500.0);
    }

    #[test]
    fn test_disconnect_keeps_rpm() {
        let store = SampleStore::new();
        store.write(3100.0, true);
        store.mark_disconnected(ConnectionState::IgnitionOff);
        let s = store.read();
        assert_eq!(s.rpm, 3100.0);
        assert!(!s.connected);
        assert_eq!(s.link, ConnectionState::IgnitionOff);
    }

    #[test]
    fn test_sequence_advances() {
        let store = SampleStore::new();
        store.write(1.0, true);
        store.mark_connected();
        store.write_speed(40.0);
        assert_eq!(store.read().sequence, 3);
    }
}
