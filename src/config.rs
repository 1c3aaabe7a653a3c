//! System configuration parameters
//!
//! All per-deployment constants for the reservoir controller: bus
//! addresses, calibration, channel maps, flow rates, and loop timing.
//! Loaded once at startup and treated as immutable afterwards.

use serde::{Deserialize, Serialize};

/// Core controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservoirConfig {
    // --- Chemistry probes ---
    /// pH probe bus address
    pub ph_address: u8,
    /// Conductivity probe bus address
    pub ec_address: u8,
    /// Read attempts before a probe is declared unavailable
    pub probe_max_attempts: u8,

    // --- Water level ---
    /// ADC input channel for the level transducer
    pub level_adc_channel: u8,
    /// Volume calibration slope (gallons per volt)
    pub level_slope_gal_per_volt: f64,
    /// Volume calibration intercept (gallons)
    pub level_intercept_gal: f64,
    /// Usable reservoir capacity (gallons); fill targets clamp here
    pub reservoir_capacity_gal: f64,
    /// Sampling trials per read
    pub level_trials: u8,
    /// Voltage samples per trial
    pub level_samples_per_trial: u16,
    /// Spacing between samples (microseconds)
    pub level_sample_interval_us: u64,
    /// Front-end power-up settle time (milliseconds)
    pub level_settle_ms: u64,

    // --- Temperature ---
    /// Decimal places kept on temperature readings
    pub temp_decimals: u32,

    // --- Dosing ---
    /// Calibrated peristaltic pump flow rate (mL per minute)
    pub pump_flow_ml_per_min: f64,

    // --- Relays / solenoid ---
    /// Number of channels on the auxiliary relay bank
    pub relay_channels: u8,
    /// Relay channel wired to the drain pump
    pub drain_relay_channel: u8,
    /// Solenoid circuit fails open (de-energized coil = closed valve)
    pub solenoid_fail_open: bool,

    // --- Timing ---
    /// Target period of one full loop iteration (seconds)
    pub cycle_target_secs: f64,
    /// Flag store poll period while idle (seconds)
    pub poll_quantum_secs: f64,
    /// Settling delay after actuation before re-sampling (seconds)
    pub settle_secs: f64,

    // --- Storage paths ---
    /// Shared request flag file
    pub flag_path: String,
    /// Append-only reading/error log
    pub datastore_path: String,
}

impl Default for ReservoirConfig {
    fn default() -> Self {
        Self {
            // Chemistry probes
            ph_address: 99,
            ec_address: 100,
            probe_max_attempts: 3,

            // Water level
            level_adc_channel: 0,
            level_slope_gal_per_volt: 10.0,
            level_intercept_gal: -5.0,
            reservoir_capacity_gal: 17.0,
            level_trials: 3,
            level_samples_per_trial: 25,
            level_sample_interval_us: 2500,
            level_settle_ms: 250,

            // Temperature
            temp_decimals: 1,

            // Dosing
            pump_flow_ml_per_min: 56.6,

            // Relays / solenoid
            relay_channels: 8,
            drain_relay_channel: 0,
            solenoid_fail_open: true,

            // Timing
            cycle_target_secs: 900.0,
            poll_quantum_secs: 0.25,
            settle_secs: 10.0,

            // Storage paths
            flag_path: "data/flags/requests.json".into(),
            datastore_path: "data/readings.jsonl".into(),
        }
    }
}

impl ReservoirConfig {
    /// Range-check the values a broken config file could ruin.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.probe_max_attempts == 0 {
            return Err("probe_max_attempts must be at least 1");
        }
        if self.level_trials == 0 || self.level_samples_per_trial == 0 {
            return Err("level sampling depth must be at least 1x1");
        }
        if self.pump_flow_ml_per_min <= 0.0 {
            return Err("pump_flow_ml_per_min must be positive");
        }
        if self.reservoir_capacity_gal <= 0.0 {
            return Err("reservoir_capacity_gal must be positive");
        }
        if self.drain_relay_channel >= self.relay_channels {
            return Err("drain_relay_channel outside the relay bank");
        }
        if self.cycle_target_secs <= 0.0 || self.poll_quantum_secs <= 0.0 {
            return Err("loop timing must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = ReservoirConfig::default();
        assert!(c.validate().is_ok());
        assert!(c.probe_max_attempts >= 1);
        assert!(c.reservoir_capacity_gal > 0.0);
        assert!(c.pump_flow_ml_per_min > 0.0);
        assert!(c.poll_quantum_secs < c.cycle_target_secs);
    }

    #[test]
    fn serde_roundtrip() {
        let c = ReservoirConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: ReservoirConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c.ph_address, c2.ph_address);
        assert_eq!(c.relay_channels, c2.relay_channels);
        assert!((c.pump_flow_ml_per_min - c2.pump_flow_ml_per_min).abs() < 1e-9);
        assert!((c.level_slope_gal_per_volt - c2.level_slope_gal_per_volt).abs() < 1e-9);
    }

    #[test]
    fn drain_channel_must_exist() {
        let mut c = ReservoirConfig::default();
        c.drain_relay_channel = c.relay_channels;
        assert!(c.validate().is_err());
    }

    #[test]
    fn sampling_depth_must_be_nonzero() {
        let mut c = ReservoirConfig::default();
        c.level_trials = 0;
        assert!(c.validate().is_err());
    }
}
