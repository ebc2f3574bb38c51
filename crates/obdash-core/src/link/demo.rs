//! Demo link - simulated vehicle for running without an adapter
//!
//! Simulates an engine idling at ~850 RPM with random throttle blips, a
//! matching road speed and a slowly warming coolant. It can also be told to
//! fail every Nth query so reconnect handling can be watched live.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;

use super::{ConnectionState, Dtc, LinkError, LinkFactory, Measurement, Parameter, VehicleLink};

const IDLE_RPM: f64 = 850.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum BlipState {
    /// Engine idling normally
    Idle,
    /// Throttle opening, RPM rising
    RampUp,
    /// At peak RPM, holding
    Hold { until_ms: u64 },
    /// Throttle closing, RPM falling
    RampDown,
}

/// Engine model driven by elapsed milliseconds
struct DemoEngine {
    rng: StdRng,
    state: BlipState,
    rpm: f64,
    target_rpm: f64,
    next_blip_at_ms: u64,
    last_ms: u64,
}

impl DemoEngine {
    fn new(mut rng: StdRng) -> Self {
        let next_blip_at_ms = rng.gen_range(3000..8000);
        Self {
            rng,
            state: BlipState::Idle,
            rpm: IDLE_RPM,
            target_rpm: IDLE_RPM,
            next_blip_at_ms,
            last_ms: 0,
        }
    }

    fn advance(&mut self, now_ms: u64) {
        let delta_s = now_ms.saturating_sub(self.last_ms) as f64 / 1000.0;
        self.last_ms = now_ms;

        self.state = match self.state {
            BlipState::Idle if now_ms >= self.next_blip_at_ms => {
                self.target_rpm = self.rng.gen_range(3000.0..7500.0);
                BlipState::RampUp
            }
            BlipState::RampUp if self.rpm >= self.target_rpm => BlipState::Hold {
                until_ms: now_ms + self.rng.gen_range(300..1500),
            },
            BlipState::Hold { until_ms } if now_ms >= until_ms => {
                self.target_rpm = IDLE_RPM;
                BlipState::RampDown
            }
            BlipState::RampDown if self.rpm <= IDLE_RPM + 1.0 => {
                self.next_blip_at_ms = now_ms + self.rng.gen_range(4000..12000);
                BlipState::Idle
            }
            other => other,
        };

        // RPM/sec slew: fast rev-up, slower fall
        let rate = if self.target_rpm > self.rpm { 6000.0 } else { 2500.0 };
        let max_change = rate * delta_s;
        self.rpm += (self.target_rpm - self.rpm).clamp(-max_change, max_change);
    }

    fn value(&self, parameter: Parameter, now_ms: u64) -> f64 {
        let t = now_ms as f64 / 1000.0;
        let wobble = if self.state == BlipState::Idle {
            20.0 * (t * 2.5).sin() + 10.0 * (t * 7.3).sin()
        } else {
            0.0
        };
        let rpm = (self.rpm + wobble).max(0.0);
        let throttle = ((rpm - IDLE_RPM) / 60.0 + 1.5).clamp(0.0, 100.0);

        match parameter {
            Parameter::Rpm => rpm,
            Parameter::Speed => ((rpm - IDLE_RPM).max(0.0) / 55.0).round(),
            Parameter::CoolantTemp => (20.0 + t * 0.5).min(90.0).round(),
            Parameter::IntakeTemp => 28.0,
            Parameter::ThrottlePosition => throttle,
            Parameter::EngineLoad => (throttle * 0.8 + 15.0).min(100.0),
            Parameter::IntakePressure => (30.0 + throttle * 0.7).round(),
            Parameter::MafRate => rpm / 300.0,
            Parameter::TimingAdvance => 10.0 + (rpm / 500.0).min(20.0),
            Parameter::RunTime => t.floor(),
            Parameter::FuelLevel => 62.0,
            Parameter::ControlModuleVoltage => 14.1 + 0.05 * (t * 0.7).sin(),
        }
    }
}

/// A simulated vehicle link
pub struct DemoLink {
    engine: DemoEngine,
    started: Instant,
    open: bool,
    queries: u64,
    fail_every: Option<u64>,
    dtcs: Vec<Dtc>,
}

impl DemoLink {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Reproducible engine behaviour
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            engine: DemoEngine::new(rng),
            started: Instant::now(),
            open: true,
            queries: 0,
            fail_every: None,
            dtcs: ["P0301", "P0420"].iter().filter_map(|c| Dtc::parse(c)).collect(),
        }
    }

    /// Make every `n`th query fail with an I/O-style error (`0` disables)
    pub fn fail_every(mut self, n: u64) -> Self {
        self.fail_every = (n > 0).then_some(n);
        self
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

impl Default for DemoLink {
    fn default() -> Self {
        Self::new()
    }
}

impl VehicleLink for DemoLink {
    fn status(&mut self) -> Result<ConnectionState, LinkError> {
        Ok(if self.open {
            ConnectionState::CarConnected
        } else {
            ConnectionState::NotConnected
        })
    }

    fn query(&mut self, parameter: Parameter) -> Result<Option<Measurement>, LinkError> {
        if !self.open {
            return Err(LinkError::NotConnected);
        }
        self.queries += 1;
        if let Some(n) = self.fail_every {
            if self.queries % n == 0 {
                return Err(LinkError::QueryFailed("simulated adapter dropout".into()));
            }
        }

        let now_ms = self.elapsed_ms();
        self.engine.advance(now_ms);
        let value = self.engine.value(parameter, now_ms);
        Ok(Some(Measurement::new(value, parameter.unit())))
    }

    fn read_dtcs(&mut self) -> Result<Vec<Dtc>, LinkError> {
        if !self.open {
            return Err(LinkError::NotConnected);
        }
        Ok(self.dtcs.clone())
    }

    fn clear_dtcs(&mut self) -> Result<(), LinkError> {
        if !self.open {
            return Err(LinkError::NotConnected);
        }
        self.dtcs.clear();
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }
}

/// Opens a fresh [`DemoLink`] per attempt
#[derive(Debug, Clone, Default)]
pub struct DemoFactory {
    fail_every: u64,
}

impl DemoFactory {
    pub fn new(fail_every: u64) -> Self {
        Self { fail_every }
    }
}

impl LinkFactory for DemoFactory {
    fn open(&mut self) -> Result<Box<dyn VehicleLink>, LinkError> {
        Ok(Box::new(DemoLink::new().fail_every(self.fail_every)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_rpm_range() {
        let mut engine = DemoEngine::new(StdRng::seed_from_u64(7));

        // First blip is at least 3 s away
        for ms in (0..3000).step_by(100) {
            engine.advance(ms);
            let rpm = engine.value(Parameter::Rpm, ms);
            assert!(rpm > 800.0 && rpm < 900.0, "RPM {} out of idle range", rpm);
        }
    }

    #[test]
    fn test_blip_rises_and_returns() {
        let mut engine = DemoEngine::new(StdRng::seed_from_u64(11));
        let mut peak: f64 = 0.0;
        for ms in (0..30_000).step_by(50) {
            engine.advance(ms);
            peak = peak.max(engine.value(Parameter::Rpm, ms));
        }
        assert!(peak > 2500.0, "engine never blipped, peak {}", peak);
    }

    #[test]
    fn test_fail_every() {
        let mut link = DemoLink::seeded(1).fail_every(3);
        assert!(link.query(Parameter::Rpm).is_ok());
        assert!(link.query(Parameter::Rpm).is_ok());
        assert!(link.query(Parameter::Rpm).unwrap_err().is_link_failure());
        assert!(link.query(Parameter::Rpm).is_ok());
    }

    #[test]
    fn test_closed_link_refuses() {
        let mut link = DemoLink::seeded(1);
        link.close();
        assert_eq!(link.status().unwrap(), ConnectionState::NotConnected);
        assert!(link.query(Parameter::Rpm).is_err());
    }

    #[test]
    fn test_clear_dtcs() {
        let mut link = DemoLink::seeded(1);
        assert_eq!(link.read_dtcs().unwrap().len(), 2);
        link.clear_dtcs().unwrap();
        assert!(link.read_dtcs().unwrap().is_empty());
    }
}
