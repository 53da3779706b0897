//! Platform capabilities consumed by the scheduler.
//!
//! Implement [`PhaseTimer`] and [`GateDriver`] once per target. The platform
//! routes the timer expiry interrupt to [`Scheduler::on_timer`] and the
//! zero-cross edge interrupt to [`Scheduler::on_zero_cross`].
//!
//! [`Scheduler::on_timer`]: crate::Scheduler::on_timer
//! [`Scheduler::on_zero_cross`]: crate::Scheduler::on_zero_cross

use crate::error::Error;

/// Output pin identifier.
pub type PinId = u8;

/// How [`PhaseTimer::rearm`] interprets its argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmMode {
    /// Ticks from the moment of the call.
    Relative,
    /// Ticks from the last [`PhaseTimer::restart`].
    Absolute,
}

/// Edge of the zero-cross signal that starts a half-cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEdge {
    Rising,
    Falling,
    Change,
}

/// One-shot countdown timer.
///
/// An armed timer fires exactly once; re-arming a pending timer replaces the
/// pending expiry without firing it.
pub trait PhaseTimer {
    /// Interpretation of [`PhaseTimer::rearm`] on this platform.
    const MODE: ArmMode;

    /// Configure the timer, stopped.
    fn init(&mut self);

    /// Convert microseconds to timer ticks.
    ///
    /// Fails with [`Error::TimerOutOfRange`] above the platform ceiling.
    fn micros_to_ticks(&self, micros: u32) -> Result<u32, Error>;

    /// Reset the time base to now and fire after `ticks`.
    fn restart(&mut self, ticks: u32);

    /// Schedule the next expiry from inside the expiry handler.
    fn rearm(&mut self, ticks: u32);

    /// Cancel any pending expiry.
    fn stop(&mut self);

    /// Busy-wait, used for fixed-width gate pulses.
    fn spin(&mut self, micros: u16);
}

/// Gate outputs and the zero-cross input.
pub trait GateDriver {
    /// Configure `pin` as a digital output, deasserted.
    fn configure_output(&mut self, pin: PinId);

    /// Assert the gate signal.
    fn assert_gate(&mut self, pin: PinId);

    /// Deassert the gate signal.
    fn release_gate(&mut self, pin: PinId);

    /// Configure the zero-cross input pin.
    fn configure_sync(&mut self, pull_up: bool);

    /// Attach the zero-cross edge interrupt.
    fn enable_sync(&mut self, edge: SyncEdge);

    /// Detach the zero-cross edge interrupt.
    fn disable_sync(&mut self);
}
