//! Line frequency monitor.
//!
//! Moving average over the last [`WINDOW`] half-cycle durations measured
//! between zero-cross edges.

use embassy_time::Instant;
use heapless::Deque;

use crate::config::SIGNAL_LOSS_FACTOR;

/// Number of half-cycle samples in the moving average.
pub const WINDOW: usize = 5;

/// Outcome of recording a half-cycle duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    Accepted,
    /// The gap was far longer than nominal; the average was reset.
    SignalLost,
}

/// Moving average of half-cycle durations
#[derive(Debug)]
pub struct FrequencyMonitor {
    window: Deque<u32, WINDOW>,
    total: u32,
    last_edge: Option<Instant>,
}

impl FrequencyMonitor {
    pub const fn new() -> Self {
        Self {
            window: Deque::new(),
            total: 0,
            last_edge: None,
        }
    }

    /// Push a duration, returning the evicted oldest one (`0` while filling).
    pub fn insert(&mut self, micros: u32) -> u32 {
        let evicted = if self.window.is_full() {
            self.window.pop_front().unwrap_or(0)
        } else {
            0
        };
        // Room was made above.
        let _ = self.window.push_back(micros);
        evicted
    }

    /// Record one half-cycle duration against the nominal semi-period.
    pub fn record(&mut self, micros: u32, semi_period_us: u16) -> Sample {
        if is_signal_lost(micros, semi_period_us) {
            self.reset();
            return Sample::SignalLost;
        }
        let evicted = self.insert(micros);
        self.total = self.total.wrapping_add(micros).wrapping_sub(evicted);
        Sample::Accepted
    }

    /// Drop every sample.
    pub fn reset(&mut self) {
        self.window.clear();
        self.total = 0;
    }

    /// Forget the previous edge as well, so the next edge only starts timing.
    pub fn restart(&mut self) {
        self.reset();
        self.last_edge = None;
    }

    /// Microseconds since the previous edge, if one was seen.
    pub fn elapsed(&self, now: Instant) -> Option<u32> {
        let last = self.last_edge?;
        let elapsed = now.checked_duration_since(last)?.as_micros();
        Some(u32::try_from(elapsed).unwrap_or(u32::MAX))
    }

    pub fn mark_edge(&mut self, now: Instant) {
        self.last_edge = Some(now);
    }

    /// Reset if no edge arrived for a signal-loss interval.
    pub fn expire(&mut self, now: Instant, semi_period_us: u16) -> bool {
        let lost = self
            .elapsed(now)
            .is_some_and(|elapsed| is_signal_lost(elapsed, semi_period_us));
        if lost {
            self.reset();
        }
        lost
    }

    pub fn count(&self) -> usize {
        self.window.len()
    }

    /// Average half-cycle duration in microseconds.
    pub fn average(&self) -> Option<u32> {
        if self.total == 0 {
            return None;
        }
        u32::try_from(self.window.len())
            .ok()
            .map(|count| self.total / count)
    }

    /// Detected line frequency in Hz, or `0` without samples.
    #[allow(clippy::cast_precision_loss)]
    pub fn frequency(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.window.len() as f32 * 1_000_000.0 / 2.0 / self.total as f32
    }
}

impl Default for FrequencyMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn is_signal_lost(micros: u32, semi_period_us: u16) -> bool {
    semi_period_us != 0 && micros > u32::from(semi_period_us) * SIGNAL_LOSS_FACTOR
}
