//! Firing scheduler context.
//!
//! One [`Scheduler`] per zero-cross input and timer. The control plane edits
//! the device table through the single [`Control`] handle; the platform's
//! interrupt handlers call [`Scheduler::on_zero_cross`] and
//! [`Scheduler::on_timer`].
//!
//! # Usage
//!
//! ```ignore
//! static SCHEDULER: Scheduler<BoardTimer, BoardGates, 8> =
//!     Scheduler::new(SchedulerConfig::mains_50hz());
//!
//! let mut control = SCHEDULER.control()?;
//! let lamp = control.create(12)?;
//! control.begin(BoardTimer::new(), BoardGates::new())?;
//! control.set_delay(&lamp, 2_500);
//!
//! // zero-cross edge interrupt
//! SCHEDULER.on_zero_cross(Instant::now());
//! // timer expiry interrupt
//! SCHEDULER.on_timer();
//! ```

mod control;
mod interrupt;

use core::cell::RefCell;

use critical_section::Mutex;
use embassy_time::Instant;
use portable_atomic::{AtomicBool, Ordering};

#[cfg(feature = "esp32-log")]
use esp_println::println;

pub use control::Control;

use crate::config::SchedulerConfig;
use crate::error::Error;
use crate::handoff::Handoff;
use crate::hal::{GateDriver, PhaseTimer};
use crate::monitor::FrequencyMonitor;
use crate::snapshot::Snapshot;
use crate::table::DeviceTable;

/// Largest supported device table.
pub const MAX_DEVICES: usize = u8::MAX as usize;

/// What the next timer expiry does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Fire,
    ReleaseGates,
}

struct Peripherals<T, G> {
    timer: T,
    gates: G,
}

/// State owned by the interrupt plane.
struct IrqState<T, G, const N: usize> {
    config: SchedulerConfig,
    hal: Option<Peripherals<T, G>>,
    snapshot: Snapshot<N>,
    /// Devices already serviced in the current half-cycle.
    cursor: usize,
    next_step: Step,
    sync_enabled: bool,
    monitor: FrequencyMonitor,
}

/// Phase-control firing scheduler for up to `N` devices.
pub struct Scheduler<T, G, const N: usize> {
    table: Handoff<DeviceTable<N>>,
    irq: Mutex<RefCell<IrqState<T, G, N>>>,
    control_taken: AtomicBool,
}

impl<T: PhaseTimer, G: GateDriver, const N: usize> Scheduler<T, G, N> {
    /// Create a scheduler.
    ///
    /// Panics (at compile time when used in a `static`) if the configuration
    /// does not validate or `N` is out of range.
    pub const fn new(config: SchedulerConfig) -> Self {
        assert!(N > 0 && N <= MAX_DEVICES, "device capacity out of range");
        assert!(
            config.validate().is_ok(),
            "invalid scheduler timing configuration"
        );
        Self {
            table: Handoff::new(DeviceTable::new(config.semi_period_us)),
            irq: Mutex::new(RefCell::new(IrqState {
                config,
                hal: None,
                snapshot: Snapshot::new(),
                cursor: 0,
                next_step: Step::Fire,
                sync_enabled: false,
                monitor: FrequencyMonitor::new(),
            })),
            control_taken: AtomicBool::new(false),
        }
    }

    /// Take the control-plane handle. Only the first call succeeds.
    pub fn control(&self) -> Result<Control<'_, T, G, N>, Error> {
        if self.control_taken.swap(true, Ordering::AcqRel) {
            return Err(Error::ControlTaken);
        }
        Ok(Control::new(self))
    }

    /// Current timing configuration.
    pub fn config(&self) -> SchedulerConfig {
        critical_section::with(|cs| self.irq.borrow_ref(cs).config)
    }

    pub fn semi_period(&self) -> u16 {
        self.config().semi_period_us
    }

    /// Nominal line frequency derived from the configured semi-period.
    pub fn frequency(&self) -> f32 {
        1_000_000.0 / 2.0 / f32::from(self.semi_period())
    }

    /// Measured line frequency, or `0` while sampling or without signal.
    pub fn detected_frequency(&self, now: Instant) -> f32 {
        #[cfg_attr(not(feature = "esp32-log"), allow(unused_variables))]
        let (frequency, lost) = critical_section::with(|cs| {
            let mut irq = self.irq.borrow_ref_mut(cs);
            let semi_period = irq.config.semi_period_us;
            let lost = irq.monitor.expire(now, semi_period);
            (irq.monitor.frequency(), lost)
        });
        #[cfg(feature = "esp32-log")]
        if lost {
            println!("[Scheduler.detected_frequency] zero-cross signal lost");
        }
        frequency
    }

    /// Keep the zero-cross interrupt enabled for monitoring even when every
    /// device is fully on or off.
    pub fn set_frequency_monitor_always_on(&self, enable: bool) {
        critical_section::with(|cs| {
            let mut irq = self.irq.borrow_ref_mut(cs);
            let irq = &mut *irq;
            if enable && !irq.sync_enabled {
                if let Some(hal) = irq.hal.as_mut() {
                    hal.gates.enable_sync(irq.config.sync.edge);
                    irq.sync_enabled = true;
                }
            }
            irq.config.monitor_always_on = enable;
        });
    }

    pub fn is_frequency_monitor_always_on(&self) -> bool {
        self.config().monitor_always_on
    }

    /// Whether the zero-cross interrupt is currently attached.
    pub fn is_sync_enabled(&self) -> bool {
        critical_section::with(|cs| self.irq.borrow_ref(cs).sync_enabled)
    }

    /// Attach the zero-cross interrupt if it was detached.
    ///
    /// Returns `true` when it had to be re-enabled.
    fn ensure_sync_enabled(&self) -> bool {
        critical_section::with(|cs| {
            let mut irq = self.irq.borrow_ref_mut(cs);
            let irq = &mut *irq;
            let Some(hal) = irq.hal.as_mut() else {
                return false;
            };
            if irq.sync_enabled {
                return false;
            }
            hal.gates.enable_sync(irq.config.sync.edge);
            irq.sync_enabled = true;
            true
        })
    }
}
