#[cfg(feature = "esp32-log")]
use esp_println::println;

use super::{IrqState, Peripherals, Scheduler};
use crate::config::{SchedulerConfig, semi_period_for};
use crate::error::{ConfigError, Error};
use crate::hal::{GateDriver, PhaseTimer, PinId};
use crate::table::{Device, DeviceHandle, DeviceTable};

/// Control-plane handle of a [`Scheduler`].
///
/// There is exactly one per scheduler, and every table edit needs
/// `&mut self`, so the device table has a single writer.
pub struct Control<'a, T, G, const N: usize> {
    scheduler: &'a Scheduler<T, G, N>,
}

impl<'a, T: PhaseTimer, G: GateDriver, const N: usize> Control<'a, T, G, N> {
    pub(super) const fn new(scheduler: &'a Scheduler<T, G, N>) -> Self {
        Self { scheduler }
    }

    /// Install the platform timer and gate driver and attach the zero-cross
    /// interrupt.
    ///
    /// The first half-cycle applies the current delays; if every device is
    /// fully on or off and monitoring is not forced, the interrupt detaches
    /// itself again.
    pub fn begin(&mut self, mut timer: T, mut gates: G) -> Result<(), Error> {
        let config = self.scheduler.config();
        critical_section::with(|cs| {
            let mut irq = self.scheduler.irq.borrow_ref_mut(cs);
            if irq.hal.is_some() {
                return Err(Error::AlreadyStarted);
            }
            timer.init();
            gates.configure_sync(config.sync.pull_up);
            self.scheduler.table.read(|table| {
                for device in table.iter() {
                    gates.configure_output(device.pin());
                }
            });
            gates.enable_sync(config.sync.edge);
            irq.sync_enabled = true;
            irq.hal = Some(Peripherals { timer, gates });
            Ok(())
        })?;

        #[cfg(feature = "esp32-log")]
        println!(
            "[Control.begin] started, semi-period {}us, {} devices",
            config.semi_period_us,
            self.device_count()
        );
        Ok(())
    }

    /// Register a device on `pin`, initially off.
    pub fn create(&mut self, pin: PinId) -> Result<DeviceHandle, Error> {
        let handle = self.scheduler.table.edit(|table| table.insert(pin));
        #[cfg(feature = "esp32-log")]
        if handle.is_err() {
            println!("[Control.create] no room for pin {}", pin);
        }
        let handle = handle?;

        self.with_gates(|gates| gates.configure_output(pin));
        Ok(handle)
    }

    /// Remove a device, compacting the table.
    ///
    /// The interrupt plane picks up the compacted table at the next
    /// zero-cross, which also releases the removed gate.
    pub fn remove(&mut self, handle: DeviceHandle) {
        self.scheduler.table.edit(|table| table.remove(handle));
        self.scheduler.ensure_sync_enabled();
    }

    /// Set the firing delay in microseconds, clamped to the semi-period.
    ///
    /// `0` fires at the zero-cross (full power), the semi-period never fires.
    pub fn set_delay(&mut self, handle: &DeviceHandle, delay_us: u16) {
        let delay_us = delay_us.min(self.scheduler.semi_period());
        if self.delay(handle) == delay_us {
            return;
        }

        let moved = self
            .scheduler
            .table
            .edit(|table| table.set_delay(handle, delay_us));
        if moved && self.scheduler.ensure_sync_enabled() {
            #[cfg(feature = "esp32-log")]
            println!("[Control.set_delay] zero-cross interrupt re-enabled");
        }
    }

    /// Current firing delay in microseconds.
    pub fn delay(&self, handle: &DeviceHandle) -> u16 {
        self.scheduler.table.read(|table| {
            table
                .get(handle)
                .map_or(table.semi_period(), Device::delay)
        })
    }

    /// Full power.
    pub fn turn_on(&mut self, handle: &DeviceHandle) {
        self.set_delay(handle, 0);
    }

    /// No power.
    pub fn turn_off(&mut self, handle: &DeviceHandle) {
        self.set_delay(handle, self.scheduler.semi_period());
    }

    /// Change the semi-period of the line at runtime.
    ///
    /// The timing policy is validated again against the new semi-period and
    /// left untouched on error. Devices that were off stay off; other delays
    /// are clamped to the new semi-period.
    pub fn set_semi_period(&mut self, semi_period_us: u16) -> Result<(), ConfigError> {
        let config = SchedulerConfig {
            semi_period_us,
            ..self.scheduler.config()
        };
        config.validate()?;

        // One critical section, so no refresh sees the new table with the old
        // margins or the other way round.
        critical_section::with(|cs| {
            self.scheduler.irq.borrow_ref_mut(cs).config = config;
            self.scheduler
                .table
                .edit(|table| table.set_semi_period(semi_period_us));
        });
        self.scheduler.ensure_sync_enabled();

        #[cfg(feature = "esp32-log")]
        println!("[Control.set_semi_period] semi-period {}us", semi_period_us);
        Ok(())
    }

    /// Change the line frequency in Hz at runtime, see
    /// [`Control::set_semi_period`].
    pub fn set_frequency(&mut self, hz: f32) -> Result<(), ConfigError> {
        self.set_semi_period(semi_period_for(hz))
    }

    pub fn device_count(&self) -> usize {
        self.scheduler.table.read(DeviceTable::len)
    }

    /// Whether every device is exactly fully on or fully off.
    pub fn all_binary(&self) -> bool {
        self.scheduler.table.read(DeviceTable::all_binary)
    }

    /// Inspect the delay-ordered device table.
    pub fn inspect<R>(&self, f: impl FnOnce(&DeviceTable<N>) -> R) -> R {
        self.scheduler.table.read(f)
    }

    pub const fn scheduler(&self) -> &'a Scheduler<T, G, N> {
        self.scheduler
    }

    fn with_gates(&self, f: impl FnOnce(&mut G)) {
        critical_section::with(|cs| {
            let mut irq = self.scheduler.irq.borrow_ref_mut(cs);
            let IrqState { hal, .. } = &mut *irq;
            if let Some(hal) = hal.as_mut() {
                f(&mut hal.gates);
            }
        });
    }
}
