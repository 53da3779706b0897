use heapless::{String, Vec};

use super::{BrightnessCurve, Light};
use crate::error::Error;
use crate::hal::{GateDriver, PhaseTimer, PinId};
use crate::scheduler::Control;

/// Longest light name in bytes.
pub const MAX_NAME_LEN: usize = 16;

pub type LightName = String<MAX_NAME_LEN>;

/// Lights addressed by name, for command and API layers.
#[derive(Debug, Default)]
pub struct LightManager<const N: usize> {
    lights: Vec<(LightName, Light), N>,
    next: usize,
}

impl<const N: usize> LightManager<N> {
    pub const fn new() -> Self {
        Self {
            lights: Vec::new(),
            next: 0,
        }
    }

    /// Create a light under a new name.
    ///
    /// Names longer than [`MAX_NAME_LEN`] are rejected as
    /// [`Error::CapacityExceeded`].
    pub fn add<T: PhaseTimer, G: GateDriver, const D: usize>(
        &mut self,
        control: &mut Control<'_, T, G, D>,
        name: &str,
        pin: PinId,
        curve: BrightnessCurve,
    ) -> Result<(), Error> {
        if self.get(name).is_some() {
            return Err(Error::NameTaken);
        }
        if self.lights.is_full() {
            return Err(Error::CapacityExceeded);
        }
        let mut key = LightName::new();
        key.push_str(name).map_err(|()| Error::CapacityExceeded)?;

        let light = Light::new(control, pin, curve)?;
        if let Err((_, light)) = self.lights.push((key, light)) {
            light.remove(control);
            return Err(Error::CapacityExceeded);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Light> {
        self.lights
            .iter()
            .find(|(key, _)| key.as_str() == name)
            .map(|(_, light)| light)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Light> {
        self.lights
            .iter_mut()
            .find(|(key, _)| key.as_str() == name)
            .map(|(_, light)| light)
    }

    /// Next entry in insertion order, wrapping around after the last one.
    pub fn next(&mut self) -> Option<(&str, &mut Light)> {
        if self.lights.is_empty() {
            return None;
        }
        if self.next >= self.lights.len() {
            self.next = 0;
        }
        let index = self.next;
        self.next += 1;
        let (name, light) = &mut self.lights[index];
        Some((name.as_str(), light))
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }
}
