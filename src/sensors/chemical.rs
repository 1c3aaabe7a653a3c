//! ASCII-protocol chemistry probes (pH and conductivity).
//!
//! The probes sit on a shared I2C bus and occasionally drop a
//! transaction mid-conversion, so reads retry with linear backoff
//! before the probe is declared unavailable. The raw reply is a decimal
//! string; a per-probe scale function turns it into the stored value.

use std::time::Duration;

use log::{info, warn};

use crate::error::SensorError;
use crate::ports::{Clock, ProbeChannel};

use super::{ReadOptions, Sensor};

/// Post-scaling applied to the parsed probe reply.
pub type ScaleFn = fn(f64) -> f64;

/// pH is reported to two decimals.
pub fn ph_scale(raw: f64) -> f64 {
    (raw * 100.0).round() / 100.0
}

/// The EC probe reports double the true PPM on this hardware revision;
/// halve and keep whole numbers.
pub fn ec_scale(raw: f64) -> f64 {
    (raw / 2.0).round()
}

pub struct ChemicalProbe<B: ProbeChannel> {
    name: &'static str,
    bus: B,
    max_attempts: u8,
    scale: ScaleFn,
}

impl<B: ProbeChannel> ChemicalProbe<B> {
    pub fn new(name: &'static str, bus: B, max_attempts: u8, scale: ScaleFn) -> Self {
        Self {
            name,
            bus,
            max_attempts: max_attempts.max(1),
            scale,
        }
    }
}

impl<B: ProbeChannel> Sensor for ChemicalProbe<B> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn read(&mut self, clock: &dyn Clock, opts: ReadOptions) -> Result<f64, SensorError> {
        for attempt in 1..=self.max_attempts {
            // Linear backoff: attempt n waits n seconds before querying.
            // The probe needs most of a second to integrate a conversion,
            // so even the first wait is load-bearing.
            clock.sleep(Duration::from_secs(u64::from(attempt)));

            match self.bus.query() {
                Ok(reply) => match reply.trim().parse::<f64>() {
                    Ok(raw) => {
                        let value = (self.scale)(raw);
                        if !opts.silent {
                            info!("{}: {}", self.name, value);
                        }
                        return Ok(value);
                    }
                    Err(_) => {
                        warn!("{} probe replied with garbage: {reply:?}", self.name);
                    }
                },
                Err(e) => {
                    warn!(
                        "{} probe read failed (attempt {attempt}/{}): {e}",
                        self.name, self.max_attempts
                    );
                }
            }
        }

        Err(SensorError::Unavailable {
            attempts: self.max_attempts,
        })
    }
}
