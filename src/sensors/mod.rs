//! Sensor subsystem — one driver per sensed modality.
//!
//! Three physical modalities feed the sampling cycle: the chemistry
//! probes (pH and conductivity share a driver), the water level
//! transducer, and the temperature probe. Each driver owns its own
//! noise-filtering and retry policy; all expose the same [`Sensor`]
//! capability so the cycle can treat them uniformly.

pub mod chemical;
pub mod level;
pub mod temperature;

use crate::error::SensorError;
use crate::ports::Clock;

/// Sampling-depth override for drivers that batch analog samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sampling {
    pub trials: u8,
    pub samples_per_trial: u16,
}

/// Per-read options accepted by every sensor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Suppress per-read logging (tight polling loops).
    pub silent: bool,
    /// Override the configured sampling depth, where the driver supports it.
    pub sampling: Option<Sampling>,
}

impl ReadOptions {
    /// Quiet read at the configured sampling depth.
    pub const fn quiet() -> Self {
        Self {
            silent: true,
            sampling: None,
        }
    }

    /// Quiet read with an overridden sampling depth.
    pub const fn quiet_with(sampling: Sampling) -> Self {
        Self {
            silent: true,
            sampling: Some(sampling),
        }
    }
}

/// Uniform read capability over all three modalities.
pub trait Sensor {
    /// Stable modality name used for persistence and logging.
    fn name(&self) -> &'static str;

    /// Take one reading.
    fn read(&mut self, clock: &dyn Clock, opts: ReadOptions) -> Result<f64, SensorError>;
}
