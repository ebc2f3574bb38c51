//! Poller - background acquisition loop
//!
//! Owns the [`VehicleLink`] exclusively and runs a three-state machine over it:
//!
//! - `Disconnected`: open a fresh link; on failure wait `reconnect_backoff`
//! - `Probing`: ask the link for its status; stay here (keeping the link)
//!   until the car answers, waiting `probe_backoff` between probes
//! - `Polling`: query RPM every `poll_interval`. "No data" keeps the last
//!   value; a link-level failure drops the link, flags the store as
//!   disconnected and waits `failure_backoff` before rebuilding
//!
//! Every failure is folded into a transition here; nothing propagates to the
//! caller. The loop stops only through its [`Shutdown`] signal, which is
//! checked between steps and wakes any backoff sleep early.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::link::{ConnectionState, LinkError, LinkFactory, Parameter, VehicleLink};
use crate::sample::SampleStore;
use crate::settings::PollerSettings;

/// Poller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Disconnected,
    Probing,
    Polling,
}

/// Timing for the poll loop
#[derive(Debug, Clone, PartialEq)]
pub struct PollerConfig {
    /// Delay between queries while polling
    pub poll_interval: Duration,
    /// Delay after a failed open
    pub reconnect_backoff: Duration,
    /// Delay between status probes while the car is not answering
    pub probe_backoff: Duration,
    /// Delay after a link failure before the link is rebuilt
    pub failure_backoff: Duration,
    /// Also query vehicle speed each cycle
    pub poll_speed: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self::from_settings(&PollerSettings::default(), 100)
    }
}

impl PollerConfig {
    pub fn from_settings(settings: &PollerSettings, poll_interval_ms: u64) -> Self {
        Self {
            poll_interval: Duration::from_millis(poll_interval_ms),
            reconnect_backoff: Duration::from_millis(settings.reconnect_backoff_ms),
            probe_backoff: Duration::from_millis(settings.probe_backoff_ms),
            failure_backoff: Duration::from_millis(settings.failure_backoff_ms),
            poll_speed: settings.poll_speed,
        }
    }
}

/// Counters for diagnostics and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollerStats {
    /// Successful link opens
    pub opens: u64,
    /// Failed link opens
    pub open_failures: u64,
    /// Link-level failures while probing or polling
    pub link_failures: u64,
    /// Queries that returned a value
    pub samples: u64,
    /// Queries that returned no data (or a garbled reply)
    pub misses: u64,
}

/// Stop signal shared between the poller thread and its owner
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown and wake any waiter
    pub fn trigger(&self) {
        let (flag, cvar) = &*self.inner;
        *flag.lock() = true;
        cvar.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Sleep for `timeout` unless shutdown is requested first.
    /// Returns `true` when shutdown was requested.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (flag, cvar) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut stopped = flag.lock();
        while !*stopped {
            if cvar.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }
        *stopped
    }
}

/// Background acquisition loop
pub struct Poller {
    factory: Box<dyn LinkFactory>,
    link: Option<Box<dyn VehicleLink>>,
    state: PollerState,
    store: SampleStore,
    config: PollerConfig,
    shutdown: Shutdown,
    stats: PollerStats,
}

impl Poller {
    pub fn new(factory: Box<dyn LinkFactory>, store: SampleStore, config: PollerConfig) -> Self {
        Self {
            factory,
            link: None,
            state: PollerState::Disconnected,
            store,
            config,
            shutdown: Shutdown::new(),
            stats: PollerStats::default(),
        }
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    pub fn stats(&self) -> PollerStats {
        self.stats
    }

    /// Whether a link handle is currently held
    pub fn has_link(&self) -> bool {
        self.link.is_some()
    }

    /// Handle for stopping [`Poller::run`] from another thread
    pub fn shutdown_signal(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Perform one state-machine transition and return how long to wait
    /// before the next one.
    pub fn step(&mut self) -> Duration {
        match self.state {
            PollerState::Disconnected => self.step_disconnected(),
            PollerState::Probing => self.step_probing(),
            PollerState::Polling => self.step_polling(),
        }
    }

    fn step_disconnected(&mut self) -> Duration {
        match self.factory.open() {
            Ok(link) => {
                self.stats.opens += 1;
                info!("vehicle link opened");
                self.link = Some(link);
                self.state = PollerState::Probing;
                Duration::ZERO
            }
            Err(e) => {
                self.stats.open_failures += 1;
                warn!(error = %e, backoff_ms = self.config.reconnect_backoff.as_millis() as u64, "link unavailable");
                self.store.mark_disconnected(ConnectionState::NotConnected);
                self.config.reconnect_backoff
            }
        }
    }

    fn step_probing(&mut self) -> Duration {
        let Some(link) = self.link.as_mut() else {
            self.state = PollerState::Disconnected;
            return Duration::ZERO;
        };

        match link.status() {
            Ok(ConnectionState::CarConnected) => {
                info!("vehicle answering, polling");
                self.state = PollerState::Polling;
                Duration::ZERO
            }
            Ok(other) => {
                debug!(status = %other, "vehicle not answering yet");
                self.store.mark_disconnected(other);
                self.config.probe_backoff
            }
            Err(e) => self.fail_link(e),
        }
    }

    fn step_polling(&mut self) -> Duration {
        match self.query(Parameter::Rpm) {
            Ok(Some(rpm)) => self.store.write(rpm, true),
            Ok(None) => self.store.mark_connected(),
            Err(e) => return self.fail_link(e),
        }

        if self.config.poll_speed {
            match self.query(Parameter::Speed) {
                Ok(Some(kph)) => self.store.write_speed(kph),
                Ok(None) => {}
                Err(e) => return self.fail_link(e),
            }
        }

        self.config.poll_interval
    }

    /// Query one parameter; transient misses come back as `Ok(None)`
    fn query(&mut self, parameter: Parameter) -> Result<Option<f64>, LinkError> {
        let link = self.link.as_mut().ok_or(LinkError::NotConnected)?;
        match link.query(parameter) {
            Ok(Some(m)) => {
                self.stats.samples += 1;
                Ok(Some(m.value))
            }
            Ok(None) => {
                self.stats.misses += 1;
                Ok(None)
            }
            Err(e) if !e.is_link_failure() => {
                self.stats.misses += 1;
                debug!(%parameter, error = %e, "transient query miss");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn fail_link(&mut self, error: LinkError) -> Duration {
        self.stats.link_failures += 1;
        warn!(error = %error, backoff_ms = self.config.failure_backoff.as_millis() as u64, "vehicle link failed, rebuilding");
        self.store.mark_disconnected(ConnectionState::NotConnected);
        // The handle is not trusted after a link-level failure
        self.close_link();
        self.state = PollerState::Disconnected;
        self.config.failure_backoff
    }

    fn close_link(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.close();
        }
    }

    /// Run until the shutdown signal fires, then close the link
    pub fn run(mut self) {
        info!("poller started");
        while !self.shutdown.is_triggered() {
            let delay = self.step();
            if self.shutdown.wait(delay) {
                break;
            }
        }
        self.close_link();
        info!(stats = ?self.stats, "poller stopped");
    }

    /// Run on a dedicated thread
    pub fn spawn(self) -> std::io::Result<PollerHandle> {
        let shutdown = self.shutdown_signal();
        let thread = std::thread::Builder::new()
            .name("obd-poller".into())
            .spawn(move || self.run())?;
        Ok(PollerHandle { shutdown, thread })
    }
}

/// Owner's side of a spawned poller
pub struct PollerHandle {
    shutdown: Shutdown,
    thread: JoinHandle<()>,
}

impl PollerHandle {
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Signal shutdown and wait for the thread to close the link and exit
    pub fn stop(self) -> std::thread::Result<()> {
        self.shutdown.trigger();
        self.thread.join()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_times_out() {
        let shutdown = Shutdown::new();
        let start = Instant::now();
        assert!(!shutdown.wait(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_wait_wakes_on_trigger() {
        let shutdown = Shutdown::new();
        let remote = shutdown.clone();
        let t = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            remote.trigger();
        });
        let start = Instant::now();
        assert!(shutdown.wait(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(5));
        t.join().unwrap();
    }

    #[test]
    fn test_zero_wait_reports_flag() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.wait(Duration::ZERO));
        shutdown.trigger();
        assert!(shutdown.wait(Duration::ZERO));
    }
}
