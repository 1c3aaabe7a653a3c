//! Unified error types for the hydrostat controller.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! top-level control loop's error handling uniform. No error in this
//! crate terminates the loop: sensor failures degrade to sentinel
//! readings, actuator failures leave the device in its last known state,
//! and a broken flag store reads as an empty request set.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level controller error
// ---------------------------------------------------------------------------

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor could not be read.
    Sensor(SensorError),
    /// An actuator command failed.
    Actuator(ActuatorError),
    /// The shared flag store could not be read or written.
    FlagStore(FlagStoreError),
    /// The time-series reading/error log could not be written.
    Store(StoreError),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::FlagStore(e) => write!(f, "flag store: {e}"),
            Self::Store(e) => write!(f, "datastore: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Hardware transport errors
// ---------------------------------------------------------------------------

/// Transport-level failure reported by a hardware port adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwError {
    /// Bus transaction failed (NAK, framing, checksum).
    Bus(&'static str),
    /// Device did not answer within its conversion window.
    Timeout,
    /// Device absent or powered down.
    NotPresent,
}

impl fmt::Display for HwError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(msg) => write!(f, "bus error: {msg}"),
            Self::Timeout => write!(f, "device timeout"),
            Self::NotPresent => write!(f, "device not present"),
        }
    }
}

impl std::error::Error for HwError {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Every read attempt failed; carries how many were made.
    Unavailable { attempts: u8 },
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { attempts } => {
                write!(f, "sensor unreachable; {attempts} attempts failed")
            }
        }
    }
}

impl std::error::Error for SensorError {}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// Digital output write failed; carries the device label.
    SwitchWrite(&'static str),
    /// Relay channel index outside the configured bank.
    NoSuchChannel(u8),
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SwitchWrite(device) => write!(f, "switch write failed for {device}"),
            Self::NoSuchChannel(ch) => write!(f, "no relay channel {ch}"),
        }
    }
}

impl std::error::Error for ActuatorError {}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Flag store errors
// ---------------------------------------------------------------------------

/// The flag store is shared with an external producer; all of these are
/// survivable. `Missing` simply means no requests have been submitted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagStoreError {
    /// Flag file does not exist.
    Missing,
    /// File exists but did not parse as a flag document.
    Corrupt,
    /// Underlying I/O failed.
    Io(std::io::ErrorKind),
}

impl fmt::Display for FlagStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "flag file missing"),
            Self::Corrupt => write!(f, "flag file corrupt"),
            Self::Io(kind) => write!(f, "flag file I/O error: {kind}"),
        }
    }
}

impl std::error::Error for FlagStoreError {}

impl From<FlagStoreError> for Error {
    fn from(e: FlagStoreError) -> Self {
        Self::FlagStore(e)
    }
}

// ---------------------------------------------------------------------------
// Datastore errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// Append to the reading/error log failed.
    Io(std::io::ErrorKind),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(kind) => write!(f, "log append failed: {kind}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
