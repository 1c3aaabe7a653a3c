//! 1-Wire water temperature probe (DS18B20 in a stainless well).
//!
//! Single-shot read path: the probe is fast and rarely fails, so there
//! is no retry policy: a failed conversion surfaces immediately and the
//! next scheduled cycle is the retry.

use log::info;

use crate::error::SensorError;
use crate::ports::{Clock, ThermalProbe};

use super::{ReadOptions, Sensor};

pub struct TempSensor<T: ThermalProbe> {
    probe: T,
    decimals: u32,
}

impl<T: ThermalProbe> TempSensor<T> {
    pub fn new(probe: T, decimals: u32) -> Self {
        Self { probe, decimals }
    }
}

impl<T: ThermalProbe> Sensor for TempSensor<T> {
    fn name(&self) -> &'static str {
        "water_temp_f"
    }

    fn read(&mut self, _clock: &dyn Clock, opts: ReadOptions) -> Result<f64, SensorError> {
        let raw = self
            .probe
            .read_fahrenheit()
            .map_err(|_| SensorError::Unavailable { attempts: 1 })?;

        let scale = 10f64.powi(self.decimals as i32);
        let temp_f = (raw * scale).round() / scale;

        if !opts.silent {
            info!("water temperature: {temp_f} F");
        }

        Ok(temp_f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sim::{SimClock, SimThermal};

    #[test]
    fn rounds_to_configured_decimals() {
        let clock = SimClock::new();
        let mut sensor = TempSensor::new(SimThermal::steady(66.27), 1);
        let temp = sensor.read(&clock, ReadOptions::default()).unwrap();
        assert!((temp - 66.3).abs() < 1e-9);

        let mut whole = TempSensor::new(SimThermal::steady(66.27), 0);
        let temp = whole.read(&clock, ReadOptions::default()).unwrap();
        assert!((temp - 66.0).abs() < 1e-9);
    }

    #[test]
    fn failure_propagates_without_retry() {
        let clock = SimClock::new();
        let mut sensor = TempSensor::new(SimThermal::failing(), 1);
        let err = sensor.read(&clock, ReadOptions::default()).unwrap_err();
        assert_eq!(err, SensorError::Unavailable { attempts: 1 });
        assert!(clock.sleeps().is_empty());
    }
}
