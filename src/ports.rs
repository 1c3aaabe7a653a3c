//! Port traits — the boundary between the control core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ sensors / actuators / monitor (domain)
//! ```
//!
//! Driven adapters (probe buses, ADC front ends, storage files, the
//! wall clock) implement these traits. The domain consumes them via
//! generics or trait objects, so the control core never touches hardware
//! or the filesystem directly, so the same loop runs against a live rig,
//! the simulated bench, or the test suite.
//!
//! Digital switch outputs (solenoid coil, relay coils, pump drivers, the
//! level sensor's power rail) do not get a crate-local port: they use
//! [`embedded_hal::digital::OutputPin`] directly.

use std::time::{Duration, Instant};

use crate::error::{FlagStoreError, HwError, StoreError};
use crate::requests::store::FlagSnapshot;

// ───────────────────────────────────────────────────────────────
// Hardware read ports (adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Transport to one ASCII-protocol chemistry probe (pH or EC).
pub trait ProbeChannel {
    /// Issue a read query and return the probe's raw reply.
    fn query(&mut self) -> Result<String, HwError>;
}

/// One single-ended channel of the analog front end.
pub trait AnalogChannel {
    /// Sample the channel voltage once.
    fn sample_voltage(&mut self) -> Result<f64, HwError>;
}

/// The 1-Wire water temperature probe.
pub trait ThermalProbe {
    /// Single-shot read in degrees Fahrenheit.
    fn read_fahrenheit(&mut self) -> Result<f64, HwError>;
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Monotonic time and blocking sleep.
///
/// Every suspension point in the loop (probe backoff, analog sampling
/// spacing, idle polling, dose timing, settling delays) goes through
/// this trait, so tests run the whole loop on virtual time.
pub trait Clock {
    fn now(&self) -> Instant;

    fn sleep(&self, duration: Duration);

    /// Wall-clock seconds since the UNIX epoch, for flag store stamps.
    fn epoch_secs(&self) -> f64;
}

// ───────────────────────────────────────────────────────────────
// Storage ports (adapter: domain → persistence)
// ───────────────────────────────────────────────────────────────

/// Append-only time-series log of readings and hardware errors.
///
/// Both operations stamp the record at call time. The core never reads
/// this store back; reporting layers do.
pub trait Datastore {
    fn write_value(&mut self, name: &str, value: f64) -> Result<(), StoreError>;

    fn write_error(&mut self, name: &str, message: &str) -> Result<(), StoreError>;
}

/// The shared request flag store.
///
/// The whole document is read and written as a unit: status updates must
/// be applied to a freshly loaded snapshot and written back whole so
/// concurrently added entries for other devices survive.
pub trait FlagStoreBackend {
    fn load(&mut self) -> Result<FlagSnapshot, FlagStoreError>;

    fn save(&mut self, snapshot: &FlagSnapshot) -> Result<(), FlagStoreError>;
}
