//! Live history
//!
//! Keeps the last few snapshots (RPM and speed) at a coarse, fixed spacing
//! for the trend line beside the gauge.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::sample::SampleState;
use crate::settings::HistorySettings;

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// One recorded point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryPoint {
    /// Time since the history started
    pub elapsed: Duration,
    pub rpm: f64,
    pub speed_kph: Option<f64>,
}

/// Bounded trend buffer
#[derive(Debug)]
pub struct LiveHistory {
    points: VecDeque<HistoryPoint>,
    capacity: usize,
    interval: Duration,
    start_time: Option<Instant>,
    last_sample: Option<Instant>,
    last_sequence: Option<u64>,
}

impl LiveHistory {
    pub fn new(capacity: usize, interval: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
            interval,
            start_time: None,
            last_sample: None,
            last_sequence: None,
        }
    }

    pub fn from_settings(settings: &HistorySettings) -> Self {
        Self::new(
            settings.capacity,
            Duration::from_millis(settings.sample_interval_ms),
        )
    }

    /// Record `snapshot` if the spacing allows it
    pub fn record(&mut self, snapshot: &SampleState) -> bool {
        self.record_at(Instant::now(), snapshot)
    }

    /// Record `snapshot` as seen at `now`. Snapshots taken while the vehicle
    /// is not answering are skipped, as are repeats of the last recorded one
    /// and ones closer than the interval to the previous point.
    pub fn record_at(&mut self, now: Instant, snapshot: &SampleState) -> bool {
        if !snapshot.connected || self.last_sequence == Some(snapshot.sequence) {
            return false;
        }
        if let Some(last) = self.last_sample {
            if now.saturating_duration_since(last) < self.interval {
                return false;
            }
        }

        let start = *self.start_time.get_or_insert(now);
        if self.points.len() >= self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(HistoryPoint {
            elapsed: now.saturating_duration_since(start),
            rpm: snapshot.rpm,
            speed_kph: snapshot.speed_kph,
        });
        self.last_sample = Some(now);
        self.last_sequence = Some(snapshot.sequence);
        true
    }

    pub fn points(&self) -> impl Iterator<Item = &HistoryPoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&HistoryPoint> {
        self.points.back()
    }

    /// Lowest and highest RPM in the buffer
    pub fn rpm_range(&self) -> Option<(f64, f64)> {
        self.points.iter().fold(None, |acc, p| match acc {
            None => Some((p.rpm, p.rpm)),
            Some((lo, hi)) => Some((lo.min(p.rpm), hi.max(p.rpm))),
        })
    }

    /// RPM trend as block characters, one per point, scaled to `0..=full_scale`
    pub fn sparkline(&self, full_scale: f64) -> String {
        sparkline(self.points.iter().map(|p| p.rpm), full_scale)
    }

    /// Speed trend, skipping points recorded before any speed reading
    pub fn speed_sparkline(&self, full_scale: f64) -> String {
        sparkline(self.points.iter().filter_map(|p| p.speed_kph), full_scale)
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.start_time = None;
        self.last_sample = None;
        self.last_sequence = None;
    }
}

fn sparkline(values: impl Iterator<Item = f64>, full_scale: f64) -> String {
    if !(full_scale > 0.0) {
        return String::new();
    }
    let top = (SPARK_LEVELS.len() - 1) as f64;
    values
        .map(|v| {
            let level = (v / full_scale).clamp(0.0, 1.0) * top;
            SPARK_LEVELS[level.round() as usize]
        })
        .collect()
}

impl Default for LiveHistory {
    fn default() -> Self {
        Self::from_settings(&HistorySettings::default())
    }
}
