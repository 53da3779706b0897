//! Brightness-oriented wrappers over scheduler devices.
//!
//! A [`Light`] maps a 0-255 brightness to a firing delay with a
//! [`BrightnessCurve`], so callers do not deal with microseconds.

mod manager;

pub use manager::{LightManager, LightName, MAX_NAME_LEN};

use crate::error::Error;
use crate::hal::{GateDriver, PhaseTimer, PinId};
use crate::scheduler::Control;
use crate::table::DeviceHandle;

/// Highest brightness value.
pub const FULL_BRIGHTNESS: u8 = u8::MAX;

/// Normalized 5th-order fit of firing delay against brightness that makes the
/// delivered power linear in brightness. Highest power first; the result is a
/// fraction of the semi-period.
const LINEARIZED_COEFFICIENTS: [f32; 6] = [
    -1.5034e-11,
    9.5843e-09,
    -2.2953e-06,
    2.5471e-04,
    -1.4965e-02,
    0.99846,
];

/// Mapping from brightness to firing delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrightnessCurve {
    /// Delay linear in brightness.
    #[default]
    Linear,
    /// Power linear in brightness.
    Linearized,
}

impl BrightnessCurve {
    /// Firing delay for `brightness` on a line with the given semi-period.
    ///
    /// `0` always maps to the semi-period (off) and [`FULL_BRIGHTNESS`] to `0`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn delay_for(self, brightness: u8, semi_period_us: u16) -> u16 {
        match brightness {
            0 => return semi_period_us,
            FULL_BRIGHTNESS => return 0,
            _ => {}
        }
        match self {
            Self::Linear => {
                let semi = u32::from(semi_period_us);
                let on = u32::from(brightness) * semi / u32::from(FULL_BRIGHTNESS);
                (semi - on) as u16
            }
            Self::Linearized => {
                let x = f32::from(brightness);
                let fraction = LINEARIZED_COEFFICIENTS
                    .iter()
                    .fold(0.0, |acc, coefficient| acc * x + coefficient);
                let delay = libm::roundf(fraction * f32::from(semi_period_us));
                delay.clamp(0.0, f32::from(semi_period_us)) as u16
            }
        }
    }
}

/// A dimmable light bound to one scheduler device.
#[derive(Debug)]
pub struct Light {
    handle: DeviceHandle,
    brightness: u8,
    curve: BrightnessCurve,
}

impl Light {
    /// Create a light on `pin`, initially off.
    pub fn new<T: PhaseTimer, G: GateDriver, const N: usize>(
        control: &mut Control<'_, T, G, N>,
        pin: PinId,
        curve: BrightnessCurve,
    ) -> Result<Self, Error> {
        Ok(Self {
            handle: control.create(pin)?,
            brightness: 0,
            curve,
        })
    }

    /// Set the brightness, `0` turns the light off.
    pub fn set_brightness<T: PhaseTimer, G: GateDriver, const N: usize>(
        &mut self,
        control: &mut Control<'_, T, G, N>,
        brightness: u8,
    ) {
        self.brightness = brightness;
        let delay = self
            .curve
            .delay_for(brightness, control.scheduler().semi_period());
        control.set_delay(&self.handle, delay);
    }

    pub const fn brightness(&self) -> u8 {
        self.brightness
    }

    pub const fn curve(&self) -> BrightnessCurve {
        self.curve
    }

    pub const fn handle(&self) -> &DeviceHandle {
        &self.handle
    }

    pub fn turn_on<T: PhaseTimer, G: GateDriver, const N: usize>(
        &mut self,
        control: &mut Control<'_, T, G, N>,
    ) {
        self.set_brightness(control, FULL_BRIGHTNESS);
    }

    pub fn turn_off<T: PhaseTimer, G: GateDriver, const N: usize>(
        &mut self,
        control: &mut Control<'_, T, G, N>,
    ) {
        self.set_brightness(control, 0);
    }

    /// Release the underlying device.
    pub fn remove<T: PhaseTimer, G: GateDriver, const N: usize>(
        self,
        control: &mut Control<'_, T, G, N>,
    ) {
        control.remove(self.handle);
    }
}
