#![no_std]

pub mod config;
pub mod error;
mod handoff;
pub mod hal;
pub mod light;
pub mod monitor;
pub mod scheduler;
pub mod snapshot;
pub mod table;

pub use config::{GateRelease, SchedulerConfig, SyncInput};
pub use error::{ConfigError, Error};
pub use hal::{ArmMode, GateDriver, PhaseTimer, PinId, SyncEdge};
pub use light::{BrightnessCurve, Light, LightManager};
pub use monitor::FrequencyMonitor;
pub use scheduler::{Control, Scheduler};
pub use table::{Device, DeviceHandle, DeviceTable};

pub use embassy_time::{Duration, Instant};
