//! Zero-cross and timer-expiry handlers.

use embassy_time::Instant;

use super::{IrqState, Peripherals, Scheduler, Step};
use crate::config::{GateRelease, SchedulerConfig};
use crate::error::Error;
use crate::hal::{ArmMode, GateDriver, PhaseTimer};
use crate::snapshot::Snapshot;

/// Time base of an arm request.
#[derive(Clone, Copy)]
enum Origin {
    /// Restart from the zero-cross edge.
    Edge,
    /// Re-arm from inside a firing step, this many microseconds after the edge.
    Step(u16),
}

impl<T: PhaseTimer, G: GateDriver, const N: usize> Scheduler<T, G, N> {
    /// Zero-cross edge handler. Call once per half-cycle from the edge
    /// interrupt.
    pub fn on_zero_cross(&self, now: Instant) {
        critical_section::with(|cs| {
            let mut irq = self.irq.borrow_ref_mut(cs);
            let IrqState {
                config,
                hal,
                snapshot,
                cursor,
                next_step,
                sync_enabled,
                monitor,
            } = &mut *irq;
            let Some(Peripherals { timer, gates }) = hal.as_mut() else {
                return;
            };
            let config = &*config;
            let semi_period = config.semi_period_us;

            if let Some(elapsed) = monitor.elapsed(now) {
                if let Some(margin) = config.spurious_edge_margin_us {
                    if elapsed < u32::from(semi_period.saturating_sub(margin)) {
                        return;
                    }
                }
                monitor.record(elapsed, semi_period);
            }
            monitor.mark_edge(now);

            // Release everything, always-on included, so that switching off
            // takes effect in this half-cycle.
            for slot in &snapshot.slots {
                gates.release_gate(slot.pin);
            }

            self.table
                .copy_if_dirty(cs, |table| snapshot.refresh(table, config));

            *cursor = 0;
            let len = snapshot.len();

            if snapshot.all_binary {
                for slot in &snapshot.slots {
                    if slot.delay == semi_period {
                        gates.release_gate(slot.pin);
                    } else {
                        gates.assert_gate(slot.pin);
                    }
                }
                *cursor = len;
                timer.stop();
                if !config.monitor_always_on {
                    gates.disable_sync();
                    *sync_enabled = false;
                    monitor.restart();
                }
                return;
            }

            while *cursor < len && snapshot.delay(*cursor) == 0 {
                gates.assert_gate(snapshot.pin(*cursor));
                *cursor += 1;
            }

            if *cursor < len && snapshot.delay(*cursor) < semi_period {
                *next_step = Step::Fire;
                if arm(timer, Origin::Edge, snapshot.delay(*cursor)).is_err() {
                    schedule_release(timer, gates, snapshot, next_step, config, Origin::Edge);
                }
            } else {
                while *cursor < len && snapshot.delay(*cursor) == semi_period {
                    *cursor += 1;
                }
                timer.stop();
            }
        });
    }

    /// Timer expiry handler.
    pub fn on_timer(&self) {
        critical_section::with(|cs| {
            let mut irq = self.irq.borrow_ref_mut(cs);
            let IrqState {
                config,
                hal,
                snapshot,
                cursor,
                next_step,
                ..
            } = &mut *irq;
            let Some(Peripherals { timer, gates }) = hal.as_mut() else {
                return;
            };

            match *next_step {
                Step::Fire => fire(timer, gates, snapshot, cursor, next_step, config),
                Step::ReleaseGates => release_gates(gates, snapshot),
            }
        });
    }
}

/// Fire the device at the cursor and every device inside its merge window,
/// then arm the next step.
fn fire<T: PhaseTimer, G: GateDriver, const N: usize>(
    timer: &mut T,
    gates: &mut G,
    snapshot: &Snapshot<N>,
    cursor: &mut usize,
    next_step: &mut Step,
    config: &SchedulerConfig,
) {
    let len = snapshot.len();
    if *cursor >= len {
        timer.stop();
        return;
    }

    let first = *cursor;
    let first_delay = snapshot.delay(first);
    let off_threshold = config.off_threshold();

    while *cursor + 1 < len
        && snapshot.delay(*cursor + 1).saturating_sub(first_delay) < config.merge_period_us
        && snapshot.delay(*cursor) <= off_threshold
    {
        gates.assert_gate(snapshot.pin(*cursor));
        *cursor += 1;
    }
    gates.assert_gate(snapshot.pin(*cursor));
    *cursor += 1;

    // Devices clamped to off need no action.
    while *cursor < len && snapshot.delay(*cursor) == config.semi_period_us {
        *cursor += 1;
    }

    let mut reference = first_delay;
    if let GateRelease::FixedPulse(width) = config.gate_release {
        timer.spin(width);
        for index in first..*cursor {
            gates.release_gate(snapshot.pin(index));
        }
        // The pulse already consumed part of the interval to the next step.
        reference = reference.saturating_add(width);
    }

    let origin = Origin::Step(reference);
    if *cursor < len {
        *next_step = Step::Fire;
        if arm(timer, origin, snapshot.delay(*cursor)).is_err() {
            schedule_release(timer, gates, snapshot, next_step, config, origin);
        }
    } else {
        schedule_release(timer, gates, snapshot, next_step, config, origin);
    }
}

/// Arm the trailing gate-release step. Without a representable interval the
/// gates are released right away.
fn schedule_release<T: PhaseTimer, G: GateDriver, const N: usize>(
    timer: &mut T,
    gates: &mut G,
    snapshot: &Snapshot<N>,
    next_step: &mut Step,
    config: &SchedulerConfig,
    origin: Origin,
) {
    match config.gate_release {
        GateRelease::BeforeSemiPeriodEnd(turn_off) => {
            *next_step = Step::ReleaseGates;
            let target = config.semi_period_us.saturating_sub(turn_off);
            if arm(timer, origin, target).is_err() {
                release_gates(gates, snapshot);
                timer.stop();
            }
        }
        GateRelease::FixedPulse(_) => timer.stop(),
    }
}

/// Release every gate that is not always on.
fn release_gates<G: GateDriver, const N: usize>(gates: &mut G, snapshot: &Snapshot<N>) {
    for slot in snapshot.slots.iter().skip(snapshot.always_on) {
        gates.release_gate(slot.pin);
    }
}

fn arm<T: PhaseTimer>(timer: &mut T, origin: Origin, target: u16) -> Result<(), Error> {
    match origin {
        Origin::Edge => {
            let ticks = timer.micros_to_ticks(u32::from(target))?;
            timer.restart(ticks);
        }
        Origin::Step(reference) => {
            let micros = match T::MODE {
                ArmMode::Relative => target.saturating_sub(reference),
                ArmMode::Absolute => target,
            };
            let ticks = timer.micros_to_ticks(u32::from(micros))?;
            timer.rearm(ticks);
        }
    }
    Ok(())
}
