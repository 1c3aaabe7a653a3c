//! Sampling cycle state machine.
//!
//! A fixed linear chain of sampling steps, one per modality:
//!
//! ```text
//!  Ph ──▶ Ec ──▶ WaterHeight ──▶ WaterTemp ──▶ (end)
//! ```
//!
//! Each step reads one sensor, persists the outcome, and hands off to a
//! successor fixed at compile time. A failed step writes an error record
//! and degrades to a `0.0` sentinel; the chain always completes, and
//! one flaky sensor never blocks or corrupts another's reading.

use embedded_hal::digital::OutputPin;
use heapless::FnvIndexMap;
use log::{error, info};

use crate::ports::{AnalogChannel, Clock, Datastore, ProbeChannel, ThermalProbe};
use crate::sensors::chemical::ChemicalProbe;
use crate::sensors::level::WaterLevelSensor;
use crate::sensors::temperature::TempSensor;
use crate::sensors::{ReadOptions, Sensor};

/// Steps in one cycle.
pub const STEP_COUNT: usize = 4;

/// Step name → value for one completed cycle (`0.0` on step failure).
/// Ephemeral: consumed by diagnostics, never persisted.
pub type CycleResult = FnvIndexMap<&'static str, f64, STEP_COUNT>;

// ---------------------------------------------------------------------------
// Step identity
// ---------------------------------------------------------------------------

/// One link in the sampling chain. The successor of every step is fixed
/// here; there is no other transition authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleStep {
    Ph,
    Ec,
    WaterHeight,
    WaterTemp,
}

impl SampleStep {
    /// Entry point of the chain.
    pub const FIRST: Self = Self::Ph;

    /// Fixed successor; `None` terminates the cycle.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Ph => Some(Self::Ec),
            Self::Ec => Some(Self::WaterHeight),
            Self::WaterHeight => Some(Self::WaterTemp),
            Self::WaterTemp => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Ph => "ph",
            Self::Ec => "ec",
            Self::WaterHeight => "water_height",
            Self::WaterTemp => "water_temp",
        }
    }
}

// ---------------------------------------------------------------------------
// Cycle runner
// ---------------------------------------------------------------------------

/// Owns the four sensor drivers and walks them through one cycle.
pub struct SamplingCycle<B, A, P, T>
where
    B: ProbeChannel,
    A: AnalogChannel,
    P: OutputPin,
    T: ThermalProbe,
{
    ph: ChemicalProbe<B>,
    ec: ChemicalProbe<B>,
    level: WaterLevelSensor<A, P>,
    temp: TempSensor<T>,
}

impl<B, A, P, T> SamplingCycle<B, A, P, T>
where
    B: ProbeChannel,
    A: AnalogChannel,
    P: OutputPin,
    T: ThermalProbe,
{
    pub fn new(
        ph: ChemicalProbe<B>,
        ec: ChemicalProbe<B>,
        level: WaterLevelSensor<A, P>,
        temp: TempSensor<T>,
    ) -> Self {
        Self { ph, ec, level, temp }
    }

    /// The level driver, for silent reads during fill/drain polling.
    pub fn level_sensor(&mut self) -> &mut WaterLevelSensor<A, P> {
        &mut self.level
    }

    /// Run one full cycle: reset to the first step, walk the chain to
    /// its end, and return the per-step results.
    pub fn cycle(&mut self, store: &mut dyn Datastore, clock: &dyn Clock) -> CycleResult {
        info!(">>> sampling cycle start");

        let mut results = CycleResult::new();
        let mut step = Some(SampleStep::FIRST);
        while let Some(current) = step {
            let value = self.run_step(current, store, clock);
            let _ = results.insert(current.name(), value);
            step = current.next();
        }

        info!("<<< sampling cycle complete");
        results
    }

    fn run_step(
        &mut self,
        step: SampleStep,
        store: &mut dyn Datastore,
        clock: &dyn Clock,
    ) -> f64 {
        let read = match step {
            SampleStep::Ph => self.ph.read(clock, ReadOptions::default()),
            SampleStep::Ec => self.ec.read(clock, ReadOptions::default()),
            SampleStep::WaterHeight => self.level.read(clock, ReadOptions::default()),
            SampleStep::WaterTemp => self.temp.read(clock, ReadOptions::default()),
        };

        match read {
            Ok(value) => {
                match step {
                    SampleStep::Ph => persist(store, "ph", value),
                    SampleStep::Ec => persist(store, "ec", value),
                    SampleStep::WaterHeight => {
                        persist(store, "water_gallons", value);
                        persist(store, "water_height_volts", self.level.last_volts());
                    }
                    SampleStep::WaterTemp => persist(store, "water_temp_f", value),
                }
                value
            }
            Err(e) => {
                error!("sensor read error for {}: {e}", step.name());
                if let Err(se) = store.write_error(step.name(), &e.to_string()) {
                    error!("error record write failed for {}: {se}", step.name());
                }
                0.0
            }
        }
    }
}

fn persist(store: &mut dyn Datastore, name: &str, value: f64) {
    if let Err(e) = store.write_value(name, value) {
        error!("datastore write failed for {name}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sim::{MemDatastore, SimAnalog, SimClock, SimPin, SimProbe, SimThermal};
    use crate::config::ReservoirConfig;
    use crate::error::HwError;
    use crate::sensors::chemical::{ec_scale, ph_scale};

    fn val(results: &CycleResult, key: &str) -> f64 {
        *results.get(key).expect("step missing from cycle result")
    }

    fn rig(
        ph: SimProbe,
        ec: SimProbe,
        adc: SimAnalog,
        thermal: SimThermal,
    ) -> SamplingCycle<SimProbe, SimAnalog, SimPin, SimThermal> {
        let config = ReservoirConfig::default();
        SamplingCycle::new(
            ChemicalProbe::new("ph", ph, config.probe_max_attempts, ph_scale),
            ChemicalProbe::new("ec", ec, config.probe_max_attempts, ec_scale),
            WaterLevelSensor::new(adc, SimPin::new(), &config),
            TempSensor::new(thermal, config.temp_decimals),
        )
    }

    #[test]
    fn chain_is_linear_and_terminates() {
        let mut seen = Vec::new();
        let mut step = Some(SampleStep::FIRST);
        while let Some(s) = step {
            seen.push(s);
            step = s.next();
        }
        assert_eq!(
            seen,
            vec![
                SampleStep::Ph,
                SampleStep::Ec,
                SampleStep::WaterHeight,
                SampleStep::WaterTemp,
            ]
        );
    }

    #[test]
    fn healthy_cycle_persists_every_modality() {
        let clock = SimClock::new();
        let mut store = MemDatastore::new();
        let mut cycle = rig(
            SimProbe::steady(6.018),
            SimProbe::steady(2460.0),
            SimAnalog::steady(1.2),
            SimThermal::steady(66.27),
        );

        let results = cycle.cycle(&mut store, &clock);

        assert_eq!(results.len(), STEP_COUNT);
        assert!((val(&results, "ph") - 6.02).abs() < 1e-9);
        assert!((val(&results, "ec") - 1230.0).abs() < 1e-9);
        assert!((val(&results, "water_height") - 7.0).abs() < 1e-9);
        assert!((val(&results, "water_temp") - 66.3).abs() < 1e-9);

        assert_eq!(store.latest("ph"), Some(6.02));
        assert_eq!(store.latest("ec"), Some(1230.0));
        assert_eq!(store.latest("water_gallons"), Some(7.0));
        assert!((store.latest("water_height_volts").unwrap() - 1.2).abs() < 1e-9);
        assert_eq!(store.latest("water_temp_f"), Some(66.3));
        assert!(store.errors.is_empty());
    }

    #[test]
    fn failed_step_degrades_and_chain_completes() {
        let clock = SimClock::new();
        let mut store = MemDatastore::new();
        let mut cycle = rig(
            SimProbe::scripted(vec![
                Err(HwError::Timeout),
                Err(HwError::Timeout),
                Err(HwError::Timeout),
            ]),
            SimProbe::steady(2460.0),
            SimAnalog::steady(1.2),
            SimThermal::steady(66.27),
        );

        let results = cycle.cycle(&mut store, &clock);

        // All four steps still ran.
        assert_eq!(results.len(), STEP_COUNT);
        assert!((val(&results, "ph") - 0.0).abs() < 1e-9);
        assert!((val(&results, "ec") - 1230.0).abs() < 1e-9);

        // The failure left an error record and no ph value.
        assert_eq!(store.latest("ph"), None);
        assert_eq!(store.errors.len(), 1);
        assert_eq!(store.errors[0].0, "ph");
        assert!(store.errors[0].1.contains("3 attempts"));
    }

    #[test]
    fn every_step_failing_still_visits_all_four() {
        let clock = SimClock::new();
        let mut store = MemDatastore::new();
        let fail = || {
            SimProbe::scripted(vec![
                Err(HwError::Timeout),
                Err(HwError::Timeout),
                Err(HwError::Timeout),
            ])
        };
        let mut cycle = rig(fail(), fail(), SimAnalog::failing(), SimThermal::failing());

        let results = cycle.cycle(&mut store, &clock);

        assert_eq!(results.len(), STEP_COUNT);
        assert!(results.values().all(|v| *v == 0.0));
        assert_eq!(store.errors.len(), STEP_COUNT);
        assert!(store.values.is_empty());
    }
}
