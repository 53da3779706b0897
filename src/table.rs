//! Device table ordered by firing delay.
//!
//! Owned by the control plane. Devices live in fixed slots addressed by
//! [`DeviceHandle`]; a separate index keeps the slots sorted by ascending
//! delay, and every device remembers its position in that index so a delay
//! change only moves it as far as needed.

use heapless::Vec;

use crate::error::Error;
use crate::hal::PinId;

/// Token for a device created by [`Control::create`].
///
/// Not `Copy`: [`Control::remove`] consumes it, so a removed device cannot be
/// addressed again.
///
/// [`Control::create`]: crate::Control::create
/// [`Control::remove`]: crate::Control::remove
#[derive(Debug, PartialEq, Eq)]
pub struct DeviceHandle {
    slot: u8,
}

impl DeviceHandle {
    /// Slot index inside the device table.
    pub const fn slot(&self) -> usize {
        self.slot as usize
    }
}

/// A single phase-controlled device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Device {
    pin: PinId,
    delay: u16,
    position: u8,
}

impl Device {
    pub const fn pin(&self) -> PinId {
        self.pin
    }

    /// Microseconds from zero-cross to firing.
    pub const fn delay(&self) -> u16 {
        self.delay
    }

    /// Index in the delay-ordered sequence.
    pub const fn position(&self) -> usize {
        self.position as usize
    }
}

/// Fixed-capacity set of devices kept sorted by delay.
#[derive(Debug)]
pub struct DeviceTable<const N: usize> {
    slots: [Option<Device>; N],
    /// Slot indices, ascending by delay.
    order: Vec<u8, N>,
    all_binary: bool,
    semi_period: u16,
}

impl<const N: usize> DeviceTable<N> {
    pub(crate) const fn new(semi_period: u16) -> Self {
        Self {
            slots: [None; N],
            order: Vec::new(),
            all_binary: true,
            semi_period,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Delay of a device that is off.
    pub const fn semi_period(&self) -> u16 {
        self.semi_period
    }

    /// True iff every delay is exactly `0` or exactly the semi-period.
    pub const fn all_binary(&self) -> bool {
        self.all_binary
    }

    pub fn get(&self, handle: &DeviceHandle) -> Option<&Device> {
        self.slots.get(handle.slot())?.as_ref()
    }

    /// Devices in ascending delay order.
    pub fn iter(&self) -> impl Iterator<Item = &Device> + '_ {
        self.order
            .iter()
            .filter_map(|&slot| self.slots[slot as usize].as_ref())
    }

    /// Add a device, initially off.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn insert(&mut self, pin: PinId) -> Result<DeviceHandle, Error> {
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(Error::CapacityExceeded)?;
        self.order
            .push(slot as u8)
            .map_err(|_| Error::CapacityExceeded)?;
        self.slots[slot] = Some(Device {
            pin,
            delay: self.semi_period,
            position: 0,
        });
        self.sort();

        Ok(DeviceHandle { slot: slot as u8 })
    }

    /// Remove a device, compacting the order and renumbering positions.
    pub(crate) fn remove(&mut self, handle: DeviceHandle) {
        let Some(device) = self.slots.get_mut(handle.slot()).and_then(Option::take) else {
            return;
        };
        self.order.remove(device.position());
        self.renumber(device.position());
        self.all_binary = self.scan_all_binary();
    }

    /// Move a device to the place matching its new delay.
    ///
    /// The delay is clamped to the semi-period. Returns `false` when the
    /// delay did not change.
    pub(crate) fn set_delay(&mut self, handle: &DeviceHandle, delay: u16) -> bool {
        let delay = delay.min(self.semi_period);
        let Some(device) = self.get(handle).copied() else {
            return false;
        };
        if delay == device.delay {
            return false;
        }

        let from = device.position();
        let len = self.order.len();
        let mut to = from;
        if delay > device.delay {
            while to + 1 < len && self.delay_at(to + 1) < delay {
                to += 1;
            }
            for i in from..to {
                self.order[i] = self.order[i + 1];
                self.set_position(i);
            }
        } else {
            while to > 0 && self.delay_at(to - 1) > delay {
                to -= 1;
            }
            for i in (to + 1..=from).rev() {
                self.order[i] = self.order[i - 1];
                self.set_position(i);
            }
        }
        self.order[to] = handle.slot;

        if let Some(device) = self.slots[handle.slot()].as_mut() {
            device.delay = delay;
        }
        self.set_position(to);

        self.all_binary = if delay == 0 || delay == self.semi_period {
            self.scan_all_binary()
        } else {
            false
        };
        true
    }

    /// Switch to a new semi-period. Devices that were off stay off, other
    /// delays are clamped; the order is unchanged.
    pub(crate) fn set_semi_period(&mut self, semi_period: u16) {
        let previous = self.semi_period;
        for device in self.slots.iter_mut().flatten() {
            device.delay = if device.delay >= previous {
                semi_period
            } else {
                device.delay.min(semi_period)
            };
        }
        self.semi_period = semi_period;
        self.all_binary = self.scan_all_binary();
    }

    fn delay_at(&self, position: usize) -> u16 {
        self.slots[self.order[position] as usize].map_or(self.semi_period, |d| d.delay)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn set_position(&mut self, position: usize) {
        if let Some(device) = self.slots[self.order[position] as usize].as_mut() {
            device.position = position as u8;
        }
    }

    fn renumber(&mut self, from: usize) {
        for position in from..self.order.len() {
            self.set_position(position);
        }
    }

    /// Stable insertion sort of the whole order, then position renumbering.
    fn sort(&mut self) {
        for i in 1..self.order.len() {
            let mut j = i;
            while j > 0 && self.delay_at(j - 1) > self.delay_at(j) {
                self.order.swap(j - 1, j);
                j -= 1;
            }
        }
        self.renumber(0);
    }

    fn scan_all_binary(&self) -> bool {
        self.iter()
            .all(|device| device.delay == 0 || device.delay == self.semi_period)
    }
}
