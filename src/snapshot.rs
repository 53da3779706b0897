//! Interrupt-owned copy of the device table.
//!
//! Delays are clamped with the start/end margins when copied, so the handlers
//! only ever see `0` (always on), the semi-period (always off), or a delay
//! that is safe to fire.

use heapless::Vec;

use crate::config::SchedulerConfig;
use crate::hal::PinId;
use crate::table::DeviceTable;

/// Clamp a delay to the values the firing handlers act on.
///
/// Delays below the start margin become `0`; delays above
/// `semi_period - end_margin` become the semi-period.
pub const fn clamp_delay(delay: u16, config: &SchedulerConfig) -> u16 {
    if delay < config.start_margin_us {
        0
    } else if delay >= config.semi_period_us || delay > config.off_threshold() {
        config.semi_period_us
    } else {
        delay
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Slot {
    pub(crate) pin: PinId,
    pub(crate) delay: u16,
}

#[derive(Debug)]
pub(crate) struct Snapshot<const N: usize> {
    pub(crate) slots: Vec<Slot, N>,
    pub(crate) always_on: usize,
    pub(crate) always_off: usize,
    pub(crate) all_binary: bool,
}

impl<const N: usize> Snapshot<N> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            always_on: 0,
            always_off: 0,
            all_binary: true,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn delay(&self, index: usize) -> u16 {
        self.slots[index].delay
    }

    pub(crate) fn pin(&self, index: usize) -> PinId {
        self.slots[index].pin
    }

    /// Rebuild from the table, recomputing the always-on/off counters.
    pub(crate) fn refresh(&mut self, table: &DeviceTable<N>, config: &SchedulerConfig) {
        self.slots.clear();
        self.always_on = 0;
        self.always_off = 0;
        for device in table.iter() {
            let delay = clamp_delay(device.delay(), config);
            if delay == 0 {
                self.always_on += 1;
            } else if delay == config.semi_period_us {
                self.always_off += 1;
            }
            // Capacity matches the table, the push cannot fail.
            let _ = self.slots.push(Slot {
                pin: device.pin(),
                delay,
            });
        }
        self.all_binary = table.all_binary();
    }
}
