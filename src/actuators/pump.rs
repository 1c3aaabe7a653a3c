//! Peristaltic dosing pumps — one channel per nutrient and pH solution.
//!
//! Dosing is time-based: the pumps run at a calibrated flow rate and the
//! driver converts a requested volume into a run duration. The running
//! pump is held by a scope guard, so it stops on every exit path
//! (normal completion, error, or unwind).

use std::time::Duration;

use embedded_hal::digital::OutputPin;
use log::{error, info};

use crate::error::ActuatorError;
use crate::ports::Clock;

/// The six dosing channels plumbed into the reservoir.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoseChannel {
    /// FloraGro
    Nute1,
    /// FloraMicro
    Nute2,
    /// FloraBloom
    Nute3,
    /// CALiMAGic
    Nute4,
    PhUp,
    PhDown,
}

pub struct DosingPump<P: OutputPin> {
    name: &'static str,
    pin: P,
    flow_ml_per_min: f64,
    running: bool,
}

impl<P: OutputPin> DosingPump<P> {
    /// Drives the motor output low immediately.
    pub fn new(name: &'static str, mut pin: P, flow_ml_per_min: f64) -> Result<Self, ActuatorError> {
        pin.set_low().map_err(|_| ActuatorError::SwitchWrite(name))?;
        Ok(Self {
            name,
            pin,
            flow_ml_per_min,
            running: false,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Dispense `ml` millilitres by running for `60 * ml / flow` seconds.
    pub fn dose(&mut self, ml: f64, clock: &dyn Clock) -> Result<(), ActuatorError> {
        if ml <= 0.0 {
            return Ok(());
        }

        let run_secs = 60.0 * ml / self.flow_ml_per_min;
        info!("{}: dosing {ml} mL ({run_secs:.1}s run)", self.name);

        let run = Run::start(self)?;
        clock.sleep(Duration::from_secs_f64(run_secs));
        run.finish()
    }
}

impl<P: OutputPin> Drop for DosingPump<P> {
    fn drop(&mut self) {
        if self.pin.set_low().is_err() {
            error!("{}: failed to stop on teardown", self.name);
        }
    }
}

/// Holds the "pump running" resource for the duration of one dose.
struct Run<'a, P: OutputPin> {
    pump: &'a mut DosingPump<P>,
    done: bool,
}

impl<'a, P: OutputPin> Run<'a, P> {
    fn start(pump: &'a mut DosingPump<P>) -> Result<Self, ActuatorError> {
        pump.pin
            .set_high()
            .map_err(|_| ActuatorError::SwitchWrite(pump.name))?;
        pump.running = true;
        Ok(Self { pump, done: false })
    }

    fn finish(mut self) -> Result<(), ActuatorError> {
        self.done = true;
        self.pump.running = false;
        self.pump
            .pin
            .set_low()
            .map_err(|_| ActuatorError::SwitchWrite(self.pump.name))
    }
}

impl<P: OutputPin> Drop for Run<'_, P> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        self.pump.running = false;
        if self.pump.pin.set_low().is_err() {
            error!("{}: failed to stop after aborted dose", self.pump.name);
        }
    }
}

/// All six dosing pumps, addressable by [`DoseChannel`].
pub struct PumpSet<P: OutputPin> {
    pub nute1: DosingPump<P>,
    pub nute2: DosingPump<P>,
    pub nute3: DosingPump<P>,
    pub nute4: DosingPump<P>,
    pub ph_up: DosingPump<P>,
    pub ph_down: DosingPump<P>,
}

impl<P: OutputPin> PumpSet<P> {
    /// Build the full set from motor pins in channel order:
    /// nute1..nute4, pH up, pH down.
    pub fn build(pins: [P; 6], flow_ml_per_min: f64) -> Result<Self, ActuatorError> {
        let [n1, n2, n3, n4, up, down] = pins;
        Ok(Self {
            nute1: DosingPump::new("nute1", n1, flow_ml_per_min)?,
            nute2: DosingPump::new("nute2", n2, flow_ml_per_min)?,
            nute3: DosingPump::new("nute3", n3, flow_ml_per_min)?,
            nute4: DosingPump::new("nute4", n4, flow_ml_per_min)?,
            ph_up: DosingPump::new("ph_up", up, flow_ml_per_min)?,
            ph_down: DosingPump::new("ph_down", down, flow_ml_per_min)?,
        })
    }

    pub fn channel(&mut self, channel: DoseChannel) -> &mut DosingPump<P> {
        match channel {
            DoseChannel::Nute1 => &mut self.nute1,
            DoseChannel::Nute2 => &mut self.nute2,
            DoseChannel::Nute3 => &mut self.nute3,
            DoseChannel::Nute4 => &mut self.nute4,
            DoseChannel::PhUp => &mut self.ph_up,
            DoseChannel::PhDown => &mut self.ph_down,
        }
    }
}
