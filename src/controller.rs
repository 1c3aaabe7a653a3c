//! Top-level control loop.
//!
//! One infinite loop per process, one driver at any instant:
//!
//! 1. the sampling cycle reads and persists every modality;
//! 2. its duration feeds the pacer;
//! 3. the request monitor owns the remaining idle budget, executing any
//!    requests it finds (which may trigger extra, unscheduled cycles).
//!
//! Nothing in here terminates the loop. If the process does come down
//! (clean exit, panic, anything), every actuator reaches its safe state
//! through its own `Drop`.

use embedded_hal::digital::OutputPin;
use log::info;

use crate::actuators::Actuators;
use crate::config::ReservoirConfig;
use crate::pace::CyclePacer;
use crate::ports::{AnalogChannel, Clock, Datastore, FlagStoreBackend, ProbeChannel, ThermalProbe};
use crate::requests::monitor::RequestMonitor;
use crate::sampler::SamplingCycle;

pub struct Controller<B, A, P, T, C>
where
    B: ProbeChannel,
    A: AnalogChannel,
    P: OutputPin,
    T: ThermalProbe,
    C: Clock,
{
    sampler: SamplingCycle<B, A, P, T>,
    actuators: Actuators<P>,
    monitor: RequestMonitor,
    pacer: CyclePacer,
    flags: Box<dyn FlagStoreBackend>,
    store: Box<dyn Datastore>,
    clock: C,
}

impl<B, A, P, T, C> Controller<B, A, P, T, C>
where
    B: ProbeChannel,
    A: AnalogChannel,
    P: OutputPin,
    T: ThermalProbe,
    C: Clock,
{
    pub fn new(
        config: &ReservoirConfig,
        sampler: SamplingCycle<B, A, P, T>,
        actuators: Actuators<P>,
        flags: Box<dyn FlagStoreBackend>,
        store: Box<dyn Datastore>,
        clock: C,
    ) -> Self {
        Self {
            sampler,
            actuators,
            monitor: RequestMonitor::new(config),
            pacer: CyclePacer::new(config.cycle_target_secs),
            flags,
            store,
            clock,
        }
    }

    /// Run forever.
    pub fn run(&mut self) -> ! {
        info!("control loop starting");
        loop {
            self.run_iteration();
        }
    }

    /// One scheduled sampling cycle plus its idle window.
    pub fn run_iteration(&mut self) {
        let started = self.clock.now();
        let results = self.sampler.cycle(self.store.as_mut(), &self.clock);
        let elapsed = self.clock.now() - started;

        // Only scheduled cycles feed the pacer; post-actuation extras
        // are off-budget.
        self.pacer.record(elapsed);
        info!(
            "cycle finished in {:.2}s: {results:?}",
            elapsed.as_secs_f64()
        );

        let budget = self.pacer.idle_budget();
        let extra = self.monitor.idle(
            budget,
            &mut self.sampler,
            &mut self.actuators,
            self.flags.as_mut(),
            self.store.as_mut(),
            &self.clock,
        );
        if extra > 0 {
            info!("{extra} unscheduled cycle(s) ran after actuation");
        }
    }
}
