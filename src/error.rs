use core::fmt;

/// Errors surfaced to control-plane callers.
///
/// The interrupt handlers never return these; they pick a safe output state
/// instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The device table already holds the maximum number of devices.
    CapacityExceeded,
    /// The platform timer cannot represent the requested interval.
    TimerOutOfRange,
    /// `begin` was already called for this scheduler.
    AlreadyStarted,
    /// The control handle of this scheduler was already taken.
    ControlTaken,
    /// A light with the same name is already registered.
    NameTaken,
}

impl Error {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CapacityExceeded => "device capacity exceeded",
            Self::TimerOutOfRange => "interval exceeds timer range",
            Self::AlreadyStarted => "scheduler already started",
            Self::ControlTaken => "control handle already taken",
            Self::NameTaken => "light name already registered",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inconsistent timing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The semi-period must be longer than zero.
    ZeroSemiPeriod,
    /// Start and end margins cover the whole semi-period.
    MarginsOverlap,
    /// The gate release point leaves no room for a merge window before the end margin.
    GateReleaseTooLate,
    /// The fixed gate pulse does not fit in the merge period or the end margin.
    PulseTooLong,
}

impl ConfigError {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ZeroSemiPeriod => "semi-period must be non-zero",
            Self::MarginsOverlap => "start and end margins overlap",
            Self::GateReleaseTooLate => {
                "end margin must exceed gate turn-off time plus merge period"
            }
            Self::PulseTooLong => {
                "fixed pulse width must be shorter than merge period and end margin"
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
