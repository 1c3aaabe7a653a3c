//! Idle-window request monitor and executor.
//!
//! Owns the quiet time between sampling cycles:
//!
//! ```text
//!  cycle ──▶ idle window ──┬─ sleep quantum ─ poll flag store ─┐
//!    ▲                     └──────────────◀────────────────────┘
//!    │                                 │ pending?
//!    │                                 ▼
//!    │        plan ─ mark fulfilling ─ execute ─ mark fulfilled
//!    │                                 │ state changed?
//!    └──── settle, extra cycle ◀───────┘
//! ```
//!
//! A sampling cycle never runs while a plan is executing and a plan is
//! never executed mid-cycle: there is exactly one driver at any instant.

use std::time::Duration;

use embedded_hal::digital::OutputPin;
use log::{error, info, warn};

use crate::actuators::pump::DoseChannel;
use crate::actuators::solenoid::{Solenoid, ValveState};
use crate::actuators::Actuators;
use crate::config::ReservoirConfig;
use crate::error::Error;
use crate::ports::{AnalogChannel, Clock, Datastore, FlagStoreBackend, ProbeChannel, ThermalProbe};
use crate::sampler::SamplingCycle;
use crate::sensors::level::WaterLevelSensor;
use crate::sensors::{ReadOptions, Sampling, Sensor};

use super::plan::{plan, Intent, PlannedAction};
use super::store::{FlagSnapshot, PendingRequest, RequestStatus};

/// Tight sampling for the fill/drain polling loop: one trial is enough
/// when the next poll is a quarter-second away.
const FILL_SAMPLING: Sampling = Sampling {
    trials: 1,
    samples_per_trial: 15,
};

pub struct RequestMonitor {
    quantum: Duration,
    settle: Duration,
    capacity_gal: f64,
    drain_channel: u8,
    /// Flag store failure already logged for the current streak.
    unavailable_logged: bool,
}

impl RequestMonitor {
    pub fn new(config: &ReservoirConfig) -> Self {
        Self {
            quantum: Duration::from_secs_f64(config.poll_quantum_secs),
            settle: Duration::from_secs_f64(config.settle_secs),
            capacity_gal: config.reservoir_capacity_gal,
            drain_channel: config.drain_relay_channel,
            unavailable_logged: false,
        }
    }

    /// Wait out `budget`, polling the flag store and executing whatever
    /// requests appear. Returns how many unscheduled sampling cycles ran
    /// after actuation.
    pub fn idle<B, A, P, T>(
        &mut self,
        budget: Duration,
        sampler: &mut SamplingCycle<B, A, P, T>,
        actuators: &mut Actuators<P>,
        flags: &mut dyn FlagStoreBackend,
        store: &mut dyn Datastore,
        clock: &dyn Clock,
    ) -> u32
    where
        B: ProbeChannel,
        A: AnalogChannel,
        P: OutputPin,
        T: ThermalProbe,
    {
        info!("monitoring requests for {:.1}s", budget.as_secs_f64());

        let deadline = clock.now() + budget;
        let mut extra_cycles = 0;
        while clock.now() < deadline {
            clock.sleep(self.quantum);
            if self.process_flag_requests(sampler, actuators, flags, store, clock) {
                info!(
                    "settling {:.0}s before post-actuation readings",
                    self.settle.as_secs_f64()
                );
                clock.sleep(self.settle);
                let _ = sampler.cycle(store, clock);
                extra_cycles += 1;
            }
        }
        extra_cycles
    }

    /// Read the flag store once and process whatever is pending:
    /// plan, mark `fulfilling`, execute, mark `fulfilled`.
    ///
    /// Returns `true` when at least one action changed physical state.
    pub fn process_flag_requests<B, A, P, T>(
        &mut self,
        sampler: &mut SamplingCycle<B, A, P, T>,
        actuators: &mut Actuators<P>,
        flags: &mut dyn FlagStoreBackend,
        store: &mut dyn Datastore,
        clock: &dyn Clock,
    ) -> bool
    where
        B: ProbeChannel,
        A: AnalogChannel,
        P: OutputPin,
        T: ThermalProbe,
    {
        let Some(snapshot) = self.poll(flags) else {
            return false;
        };
        let pending = snapshot.pending();
        if pending.is_empty() {
            return false;
        }

        info!("{} pending request(s) found", pending.len());
        for request in &pending {
            if Intent::from_names(&request.device, &request.action).is_none() {
                warn!(
                    "unrecognized request {}:{}; will fulfill with no effect",
                    request.device, request.action
                );
            }
        }

        let planned = plan(&pending);
        self.mark(flags, &pending, RequestStatus::Fulfilling, clock);

        let mut changed = false;
        for action in &planned {
            changed |= self.execute(action, sampler, actuators, store, clock);
        }

        self.mark(flags, &pending, RequestStatus::Fulfilled, clock);
        changed
    }

    // ── Polling and status bookkeeping ────────────────────────

    fn poll(&mut self, flags: &mut dyn FlagStoreBackend) -> Option<FlagSnapshot> {
        match flags.load() {
            Ok(snapshot) => {
                self.unavailable_logged = false;
                Some(snapshot)
            }
            Err(e) => {
                if !self.unavailable_logged {
                    warn!("flag store unavailable ({e}); treating as no pending requests");
                    self.unavailable_logged = true;
                }
                None
            }
        }
    }

    fn mark(
        &self,
        flags: &mut dyn FlagStoreBackend,
        handled: &[PendingRequest],
        status: RequestStatus,
        clock: &dyn Clock,
    ) {
        // Fresh read-modify-write: entries added concurrently for other
        // devices must survive the status update.
        let mut snapshot = match flags.load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("flag store reload failed before status update: {e}");
                return;
            }
        };
        for request in handled {
            if !snapshot.set_status(&request.device, &request.action, status) {
                warn!(
                    "flag entry {}:{} vanished before status update",
                    request.device, request.action
                );
            }
        }
        snapshot.at = clock.epoch_secs();
        if let Err(e) = flags.save(&snapshot) {
            error!("flag store write failed: {e}");
        }
    }

    // ── Execution ─────────────────────────────────────────────

    fn execute<B, A, P, T>(
        &self,
        action: &PlannedAction,
        sampler: &mut SamplingCycle<B, A, P, T>,
        actuators: &mut Actuators<P>,
        store: &mut dyn Datastore,
        clock: &dyn Clock,
    ) -> bool
    where
        B: ProbeChannel,
        A: AnalogChannel,
        P: OutputPin,
        T: ThermalProbe,
    {
        info!(
            "executing {}:{} = {}",
            action.intent.device(),
            action.intent.action(),
            action.value
        );
        match action.intent {
            Intent::Drain | Intent::SetLevel | Intent::Fill => {
                self.adjust_level(action.value, sampler, actuators, store, clock)
            }
            Intent::Nute1 => self.dose(DoseChannel::Nute1, action.value, actuators, store, clock),
            Intent::Nute2 => self.dose(DoseChannel::Nute2, action.value, actuators, store, clock),
            Intent::Nute3 => self.dose(DoseChannel::Nute3, action.value, actuators, store, clock),
            Intent::Nute4 => self.dose(DoseChannel::Nute4, action.value, actuators, store, clock),
            Intent::PhUp => self.dose(DoseChannel::PhUp, action.value, actuators, store, clock),
            Intent::PhDown => self.dose(DoseChannel::PhDown, action.value, actuators, store, clock),
        }
    }

    /// Move the water level toward `target_gal`: open the fill solenoid
    /// when water must be added, energize the drain relay when it must
    /// be removed.
    fn adjust_level<B, A, P, T>(
        &self,
        target_gal: f64,
        sampler: &mut SamplingCycle<B, A, P, T>,
        actuators: &mut Actuators<P>,
        store: &mut dyn Datastore,
        clock: &dyn Clock,
    ) -> bool
    where
        B: ProbeChannel,
        A: AnalogChannel,
        P: OutputPin,
        T: ThermalProbe,
    {
        let target = target_gal.min(self.capacity_gal);
        if target < target_gal {
            warn!("level target {target_gal} gal clamped to capacity {target}");
        }

        let current = match sampler.level_sensor().read(clock, ReadOptions::quiet()) {
            Ok(gallons) => gallons,
            Err(e) => {
                error!("level read failed before adjustment: {e}");
                record_error(store, "water_height", &e.to_string());
                return false;
            }
        };

        if target > current {
            self.fill(target, sampler, actuators, store, clock)
        } else if target < current {
            // Physical drain hardware hangs off the relay; energizing
            // the channel is the hand-off point.
            info!("draining toward {target} gal (current {current})");
            match actuators.relays.set(self.drain_channel, true) {
                Ok(()) => true,
                Err(e) => {
                    error!("drain relay failed: {e}");
                    record_error(store, "drain_relay", &e.to_string());
                    false
                }
            }
        } else {
            info!("level already at {current} gal; nothing to do");
            false
        }
    }

    fn fill<B, A, P, T>(
        &self,
        target_gal: f64,
        sampler: &mut SamplingCycle<B, A, P, T>,
        actuators: &mut Actuators<P>,
        store: &mut dyn Datastore,
        clock: &dyn Clock,
    ) -> bool
    where
        B: ProbeChannel,
        A: AnalogChannel,
        P: OutputPin,
        T: ThermalProbe,
    {
        info!("filling reservoir to {target_gal} gal");

        let outcome = fill_loop(
            target_gal,
            sampler.level_sensor(),
            &mut actuators.solenoid,
            clock,
            self.quantum,
        );

        let opened = actuators.solenoid.state() == ValveState::Open;

        // The valve closes on success and failure alike.
        if let Err(e) = actuators.solenoid.close() {
            error!("solenoid close failed: {e}");
            record_error(store, "solenoid", &e.to_string());
        }

        match outcome {
            Ok(gallons) => info!("fill complete at {gallons} gal"),
            Err(e) => {
                error!("fill aborted: {e}");
                record_error(store, "water_height", &e.to_string());
            }
        }

        opened
    }

    fn dose<P: OutputPin>(
        &self,
        channel: DoseChannel,
        ml: f64,
        actuators: &mut Actuators<P>,
        store: &mut dyn Datastore,
        clock: &dyn Clock,
    ) -> bool {
        let pump = actuators.pumps.channel(channel);
        match pump.dose(ml, clock) {
            Ok(()) => ml > 0.0,
            Err(e) => {
                error!("{} dose failed: {e}", pump.name());
                record_error(store, pump.name(), &e.to_string());
                false
            }
        }
    }
}

/// Poll the level until the first reading at or above `target_gal`,
/// keeping the solenoid commanded open between polls.
fn fill_loop<A: AnalogChannel, P: OutputPin>(
    target_gal: f64,
    level: &mut WaterLevelSensor<A, P>,
    solenoid: &mut Solenoid<P>,
    clock: &dyn Clock,
    quantum: Duration,
) -> Result<f64, Error> {
    loop {
        let gallons = level.read(clock, ReadOptions::quiet_with(FILL_SAMPLING))?;
        if gallons >= target_gal {
            return Ok(gallons);
        }
        solenoid.open()?;
        clock.sleep(quantum);
    }
}

fn record_error(store: &mut dyn Datastore, name: &str, message: &str) {
    if let Err(e) = store.write_error(name, message) {
        error!("error record write failed for {name}: {e}");
    }
}
