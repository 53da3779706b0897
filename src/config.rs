//! Timing policy of the firing scheduler.
//!
//! All values are microseconds. Margins and windows are policy, so they are
//! carried in [`SchedulerConfig`] and checked by [`SchedulerConfig::validate`]
//! (a `const fn`, so a scheduler built in a `static` fails to compile with an
//! inconsistent configuration).

use crate::error::ConfigError;
use crate::hal::SyncEdge;

/// Semi-period of a 50 Hz line.
pub const SEMI_PERIOD_50HZ_US: u16 = 10_000;

/// Semi-period of a 60 Hz line.
pub const SEMI_PERIOD_60HZ_US: u16 = 8_333;

/// Delays below this collapse to "always on".
pub const DEFAULT_START_MARGIN_US: u16 = 200;

/// Delays above `semi_period - end_margin` collapse to "always off".
pub const DEFAULT_END_MARGIN_US: u16 = 600;

/// Devices closer than this to the first device of a step fire in the same step.
///
/// Some timers cannot be re-armed for very short intervals (ESP8266 wants more
/// than 10us, 8-bit AVR timers need around 100us).
pub const DEFAULT_MERGE_PERIOD_US: u16 = 20;

/// Distance from the end of the semi-period at which gate signals are released.
pub const DEFAULT_GATE_TURN_OFF_US: u16 = 300;

/// Gaps longer than this many nominal semi-periods count as signal loss.
pub const SIGNAL_LOSS_FACTOR: u32 = 16;

/// Semi-period in microseconds of a line at `hz`, `0` for non-positive input.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub const fn semi_period_for(hz: f32) -> u16 {
    if hz > 0.0 {
        (1_000_000.0 / 2.0 / hz) as u16
    } else {
        0
    }
}

/// How gate signals are released after firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRelease {
    /// One trailing timer step at `semi_period - us` releases every gate that is
    /// not always on.
    BeforeSemiPeriodEnd(u16),
    /// Gates are held for a fixed pulse inside the firing step, then released.
    ///
    /// The interrupt busy-waits for the pulse, so it must be shorter than
    /// both the merge period and the end margin.
    FixedPulse(u16),
}

/// Zero-cross input wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncInput {
    pub edge: SyncEdge,
    pub pull_up: bool,
}

impl SyncInput {
    pub const fn rising() -> Self {
        Self {
            edge: SyncEdge::Rising,
            pull_up: false,
        }
    }
}

/// Scheduler timing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub semi_period_us: u16,
    pub start_margin_us: u16,
    pub end_margin_us: u16,
    pub merge_period_us: u16,
    pub gate_release: GateRelease,
    pub sync: SyncInput,
    /// Ignore edges that arrive earlier than `semi_period - margin` after the
    /// previous accepted edge.
    pub spurious_edge_margin_us: Option<u16>,
    /// Keep the zero-cross interrupt running for frequency monitoring even when
    /// every device is fully on or off.
    pub monitor_always_on: bool,
}

impl SchedulerConfig {
    /// Defaults for a 50 Hz line.
    pub const fn mains_50hz() -> Self {
        Self::with_semi_period(SEMI_PERIOD_50HZ_US)
    }

    /// Defaults for a 60 Hz line.
    pub const fn mains_60hz() -> Self {
        Self::with_semi_period(SEMI_PERIOD_60HZ_US)
    }

    /// Defaults for an arbitrary line frequency in Hz.
    ///
    /// Non-positive frequencies produce a zero semi-period, which fails
    /// validation.
    pub const fn from_frequency(hz: f32) -> Self {
        Self::with_semi_period(semi_period_for(hz))
    }

    /// Defaults with a custom semi-period.
    pub const fn with_semi_period(semi_period_us: u16) -> Self {
        Self {
            semi_period_us,
            start_margin_us: DEFAULT_START_MARGIN_US,
            end_margin_us: DEFAULT_END_MARGIN_US,
            merge_period_us: DEFAULT_MERGE_PERIOD_US,
            gate_release: GateRelease::BeforeSemiPeriodEnd(DEFAULT_GATE_TURN_OFF_US),
            sync: SyncInput::rising(),
            spurious_edge_margin_us: None,
            monitor_always_on: true,
        }
    }

    #[must_use]
    pub const fn with_margins(mut self, start_us: u16, end_us: u16) -> Self {
        self.start_margin_us = start_us;
        self.end_margin_us = end_us;
        self
    }

    #[must_use]
    pub const fn with_merge_period(mut self, merge_us: u16) -> Self {
        self.merge_period_us = merge_us;
        self
    }

    #[must_use]
    pub const fn with_gate_release(mut self, release: GateRelease) -> Self {
        self.gate_release = release;
        self
    }

    #[must_use]
    pub const fn with_sync(mut self, sync: SyncInput) -> Self {
        self.sync = sync;
        self
    }

    #[must_use]
    pub const fn with_spurious_edge_filter(mut self, margin_us: u16) -> Self {
        self.spurious_edge_margin_us = Some(margin_us);
        self
    }

    #[must_use]
    pub const fn with_monitor_always_on(mut self, enable: bool) -> Self {
        self.monitor_always_on = enable;
        self
    }

    /// Highest delay that still fires; anything above is treated as off.
    pub const fn off_threshold(&self) -> u16 {
        self.semi_period_us.saturating_sub(self.end_margin_us)
    }

    /// Check the relations between margins, merge window and gate release.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.semi_period_us == 0 {
            return Err(ConfigError::ZeroSemiPeriod);
        }
        if self.start_margin_us as u32 + self.end_margin_us as u32
            >= self.semi_period_us as u32
        {
            return Err(ConfigError::MarginsOverlap);
        }
        match self.gate_release {
            GateRelease::BeforeSemiPeriodEnd(turn_off) => {
                if self.end_margin_us as u32
                    <= turn_off as u32 + self.merge_period_us as u32
                {
                    return Err(ConfigError::GateReleaseTooLate);
                }
            }
            GateRelease::FixedPulse(width) => {
                // A device due while the pulse busy-waits would fire late.
                if width >= self.end_margin_us || width >= self.merge_period_us {
                    return Err(ConfigError::PulseTooLong);
                }
            }
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::mains_50hz()
    }
}
