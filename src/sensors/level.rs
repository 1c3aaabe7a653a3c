//! Resistive tape water level sensor behind the analog front end.
//!
//! The front end is powered through a MOSFET rail switch and energized
//! only for the duration of a read: the rail is shared with the pH
//! probe's reference and must not stay hot between samples.
//!
//! Filtering is two-stage: the median within each trial knocks out
//! transient spikes and the mean across trial medians smooths aliasing.
//! A linear calibration then converts volts to gallons.

use std::time::Duration;

use embedded_hal::digital::OutputPin;
use log::{info, warn};

use crate::config::ReservoirConfig;
use crate::error::SensorError;
use crate::ports::{AnalogChannel, Clock};

use super::{ReadOptions, Sampling, Sensor};

pub struct WaterLevelSensor<A: AnalogChannel, P: OutputPin> {
    adc: A,
    rail: P,
    slope: f64,
    intercept: f64,
    sampling: Sampling,
    sample_interval: Duration,
    settle: Duration,
    last_volts: f64,
}

impl<A: AnalogChannel, P: OutputPin> WaterLevelSensor<A, P> {
    pub fn new(adc: A, rail: P, config: &ReservoirConfig) -> Self {
        Self {
            adc,
            rail,
            slope: config.level_slope_gal_per_volt,
            intercept: config.level_intercept_gal,
            sampling: Sampling {
                trials: config.level_trials,
                samples_per_trial: config.level_samples_per_trial,
            },
            sample_interval: Duration::from_micros(config.level_sample_interval_us),
            settle: Duration::from_millis(config.level_settle_ms),
            last_volts: -1.0,
        }
    }

    /// Raw voltage of the most recent read, `-1.0` before the first one.
    pub fn last_volts(&self) -> f64 {
        self.last_volts
    }

    fn volts_to_gallons(&self, volts: f64) -> f64 {
        let gallons = (self.slope * volts + self.intercept).max(0.0);
        (gallons * 10.0).round() / 10.0
    }

    fn sample_trials(
        &mut self,
        clock: &dyn Clock,
        sampling: Sampling,
    ) -> Result<f64, SensorError> {
        let trials = sampling.trials.max(1);
        let samples_per_trial = sampling.samples_per_trial.max(1);

        clock.sleep(self.settle);

        let mut medians = Vec::with_capacity(usize::from(trials));
        for _ in 0..trials {
            let mut samples = Vec::with_capacity(usize::from(samples_per_trial));
            for _ in 0..samples_per_trial {
                let volts = self
                    .adc
                    .sample_voltage()
                    .map_err(|_| SensorError::Unavailable { attempts: 1 })?;
                samples.push(volts);
                clock.sleep(self.sample_interval);
            }
            medians.push(median(&mut samples));
        }

        Ok(medians.iter().sum::<f64>() / medians.len() as f64)
    }
}

impl<A: AnalogChannel, P: OutputPin> Sensor for WaterLevelSensor<A, P> {
    fn name(&self) -> &'static str {
        "water_height"
    }

    fn read(&mut self, clock: &dyn Clock, opts: ReadOptions) -> Result<f64, SensorError> {
        let sampling = opts.sampling.unwrap_or(self.sampling);

        if self.rail.set_high().is_err() {
            return Err(SensorError::Unavailable { attempts: 1 });
        }

        let outcome = self.sample_trials(clock, sampling);

        // The rail drops no matter how sampling went.
        if self.rail.set_low().is_err() {
            warn!("level front-end rail switch stuck on");
        }

        let volts = outcome?;
        self.last_volts = volts;
        let gallons = self.volts_to_gallons(volts);

        if !opts.silent {
            info!("reservoir level: {gallons} gal ({volts:.3} V)");
        }

        Ok(gallons)
    }
}

/// Median of a sample buffer; even-length buffers average the middle pair.
fn median(samples: &mut [f64]) -> f64 {
    samples.sort_by(f64::total_cmp);
    let mid = samples.len() / 2;
    if samples.len() % 2 == 0 {
        (samples[mid - 1] + samples[mid]) / 2.0
    } else {
        samples[mid]
    }
}
