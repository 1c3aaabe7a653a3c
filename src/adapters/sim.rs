//! Simulated bench rig.
//!
//! Implements every hardware and storage port in memory so the full
//! control loop can run on a development host and inside the test
//! suite. Pins and clocks hand out cloneable handles over shared state,
//! letting a test keep observing an output after the driver that owns
//! it has been moved or dropped.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};

use crate::error::{FlagStoreError, HwError, StoreError};
use crate::ports::{AnalogChannel, Clock, Datastore, FlagStoreBackend, ProbeChannel, ThermalProbe};
use crate::requests::store::FlagSnapshot;

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

// ───────────────────────────────────────────────────────────────
// SimPin — digital output with observable write history
// ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct SimPinError;

impl embedded_hal::digital::Error for SimPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Clone, Default)]
pub struct SimPin {
    state: Arc<AtomicBool>,
    writes: Arc<Mutex<Vec<bool>>>,
    fail_writes: Arc<AtomicBool>,
}

impl SimPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.state.load(Ordering::Relaxed)
    }

    /// Every level actually written, in order.
    pub fn writes(&self) -> Vec<bool> {
        lock(&self.writes).clone()
    }

    pub fn writes_to(&self, level: bool) -> usize {
        lock(&self.writes).iter().filter(|&&w| w == level).count()
    }

    /// Make every subsequent write fail (driver fault injection).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    fn write(&mut self, level: bool) -> Result<(), SimPinError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(SimPinError);
        }
        self.state.store(level, Ordering::Relaxed);
        lock(&self.writes).push(level);
        Ok(())
    }
}

impl ErrorType for SimPin {
    type Error = SimPinError;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}

// ───────────────────────────────────────────────────────────────
// SimProbe — scripted chemistry probe transport
// ───────────────────────────────────────────────────────────────

pub struct SimProbe {
    script: VecDeque<Result<String, HwError>>,
    steady: Option<f64>,
}

impl SimProbe {
    /// Always reply with the same value (bench rig).
    pub fn steady(value: f64) -> Self {
        Self {
            script: VecDeque::new(),
            steady: Some(value),
        }
    }

    /// Play back `replies` in order, then fail.
    pub fn scripted(replies: Vec<Result<String, HwError>>) -> Self {
        Self {
            script: replies.into(),
            steady: None,
        }
    }
}

impl ProbeChannel for SimProbe {
    fn query(&mut self) -> Result<String, HwError> {
        if let Some(reply) = self.script.pop_front() {
            return reply;
        }
        match self.steady {
            Some(value) => Ok(format!("{value:.3}")),
            None => Err(HwError::NotPresent),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// SimAnalog — voltage source with optional ramp
// ───────────────────────────────────────────────────────────────

/// Shared sample counter handed out by [`SimAnalog::sample_counter`].
#[derive(Clone, Default)]
pub struct SampleCounter(Arc<AtomicUsize>);

impl SampleCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct SimAnalog {
    volts: f64,
    step: f64,
    fail: bool,
    samples: SampleCounter,
}

impl SimAnalog {
    pub fn steady(volts: f64) -> Self {
        Self {
            volts,
            step: 0.0,
            fail: false,
            samples: SampleCounter::default(),
        }
    }

    /// Voltage rises by `step` after every sample, like a tank being filled.
    pub fn ramp(start_volts: f64, step: f64) -> Self {
        Self {
            volts: start_volts,
            step,
            fail: false,
            samples: SampleCounter::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            volts: 0.0,
            step: 0.0,
            fail: true,
            samples: SampleCounter::default(),
        }
    }

    pub fn sample_counter(&self) -> SampleCounter {
        self.samples.clone()
    }
}

impl AnalogChannel for SimAnalog {
    fn sample_voltage(&mut self) -> Result<f64, HwError> {
        if self.fail {
            return Err(HwError::NotPresent);
        }
        self.samples.0.fetch_add(1, Ordering::Relaxed);
        let volts = self.volts;
        self.volts += self.step;
        Ok(volts)
    }
}

// ───────────────────────────────────────────────────────────────
// SimThermal
// ───────────────────────────────────────────────────────────────

pub struct SimThermal {
    temp_f: f64,
    fail: bool,
}

impl SimThermal {
    pub fn steady(temp_f: f64) -> Self {
        Self {
            temp_f,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            temp_f: 0.0,
            fail: true,
        }
    }
}

impl ThermalProbe for SimThermal {
    fn read_fahrenheit(&mut self) -> Result<f64, HwError> {
        if self.fail {
            return Err(HwError::Timeout);
        }
        Ok(self.temp_f)
    }
}

// ───────────────────────────────────────────────────────────────
// SimClock — virtual time
// ───────────────────────────────────────────────────────────────

/// Virtual clock: `sleep` advances time instantly and records the
/// request, so multi-minute loop timing runs in microseconds under test.
#[derive(Clone)]
pub struct SimClock {
    start: Instant,
    offset: Arc<Mutex<Duration>>,
    sleeps: Arc<Mutex<Vec<Duration>>>,
    epoch: Arc<Mutex<f64>>,
}

impl SimClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
            sleeps: Arc::new(Mutex::new(Vec::new())),
            epoch: Arc::new(Mutex::new(1_700_000_000.0)),
        }
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        lock(&self.sleeps).clone()
    }

    /// Total virtual time elapsed.
    pub fn elapsed(&self) -> Duration {
        *lock(&self.offset)
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SimClock {
    fn now(&self) -> Instant {
        self.start + *lock(&self.offset)
    }

    fn sleep(&self, duration: Duration) {
        *lock(&self.offset) += duration;
        *lock(&self.epoch) += duration.as_secs_f64();
        lock(&self.sleeps).push(duration);
    }

    fn epoch_secs(&self) -> f64 {
        *lock(&self.epoch)
    }
}

// ───────────────────────────────────────────────────────────────
// MemDatastore
// ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemDatastore {
    pub values: Vec<(String, f64)>,
    pub errors: Vec<(String, String)>,
}

impl MemDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent value written under `name`.
    pub fn latest(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn values_for(&self, name: &str) -> Vec<f64> {
        self.values
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| *v)
            .collect()
    }
}

impl Datastore for MemDatastore {
    fn write_value(&mut self, name: &str, value: f64) -> Result<(), StoreError> {
        self.values.push((name.to_string(), value));
        Ok(())
    }

    fn write_error(&mut self, name: &str, message: &str) -> Result<(), StoreError> {
        self.errors.push((name.to_string(), message.to_string()));
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// MemFlagStore
// ───────────────────────────────────────────────────────────────

/// In-memory flag store that remembers every snapshot written, so tests
/// can observe intermediate status transitions.
#[derive(Default)]
pub struct MemFlagStore {
    current: Option<FlagSnapshot>,
    saves: Vec<FlagSnapshot>,
}

impl MemFlagStore {
    /// A store whose file does not exist yet.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(snapshot: FlagSnapshot) -> Self {
        Self {
            current: Some(snapshot),
            saves: Vec::new(),
        }
    }

    pub fn current(&self) -> Option<&FlagSnapshot> {
        self.current.as_ref()
    }

    /// Every snapshot written, in order.
    pub fn saves(&self) -> &[FlagSnapshot] {
        &self.saves
    }
}

impl FlagStoreBackend for MemFlagStore {
    fn load(&mut self) -> Result<FlagSnapshot, FlagStoreError> {
        self.current.clone().ok_or(FlagStoreError::Missing)
    }

    fn save(&mut self, snapshot: &FlagSnapshot) -> Result<(), FlagStoreError> {
        self.current = Some(snapshot.clone());
        self.saves.push(snapshot.clone());
        Ok(())
    }
}
