//! Hydrostat daemon — main entry point.
//!
//! Boots the control loop against the simulated bench rig: steady
//! probes, a quiet reservoir, file-backed storage. A real deployment
//! swaps the `sim` hardware for adapters over its board's HAL and wires
//! them into the same `Controller`; nothing else changes.

use anyhow::Context;
use log::info;

use hydrostat::actuators::pump::PumpSet;
use hydrostat::actuators::relay::RelayBank;
use hydrostat::actuators::solenoid::Solenoid;
use hydrostat::actuators::Actuators;
use hydrostat::adapters::clock::SystemClock;
use hydrostat::adapters::datastore::JsonlDatastore;
use hydrostat::adapters::flags::FileFlagStore;
use hydrostat::adapters::sim::{SimAnalog, SimPin, SimProbe, SimThermal};
use hydrostat::config::ReservoirConfig;
use hydrostat::controller::Controller;
use hydrostat::error::Error;
use hydrostat::sampler::SamplingCycle;
use hydrostat::sensors::chemical::{ec_scale, ph_scale, ChemicalProbe};
use hydrostat::sensors::level::WaterLevelSensor;
use hydrostat::sensors::temperature::TempSensor;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // ── 1. Configuration ──────────────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "hydrostat.json".to_string());
    let config = load_config(&config_path)?;
    config
        .validate()
        .map_err(|msg| anyhow::anyhow!("invalid config: {msg}"))?;
    info!(
        "configured: {} gal reservoir, {}s cycle target",
        config.reservoir_capacity_gal, config.cycle_target_secs
    );

    // ── 2. Storage ────────────────────────────────────────────
    ensure_parent_dir(&config.flag_path)?;
    ensure_parent_dir(&config.datastore_path)?;
    let flags = FileFlagStore::new(&config.flag_path);
    let store = JsonlDatastore::new(&config.datastore_path);

    // ── 3. Sensors (bench rig) ────────────────────────────────
    let sampler = SamplingCycle::new(
        ChemicalProbe::new(
            "ph",
            SimProbe::steady(6.018),
            config.probe_max_attempts,
            ph_scale,
        ),
        ChemicalProbe::new(
            "ec",
            SimProbe::steady(2460.0),
            config.probe_max_attempts,
            ec_scale,
        ),
        WaterLevelSensor::new(SimAnalog::steady(1.62), SimPin::new(), &config),
        TempSensor::new(SimThermal::steady(66.2), config.temp_decimals),
    );

    // ── 4. Actuators (bench rig) ──────────────────────────────
    let solenoid =
        Solenoid::new(SimPin::new(), config.solenoid_fail_open).map_err(Error::from)?;
    let relays = RelayBank::new(
        (0..config.relay_channels).map(|_| SimPin::new()).collect(),
    )
    .map_err(Error::from)?;
    let pumps = PumpSet::build(
        core::array::from_fn(|_| SimPin::new()),
        config.pump_flow_ml_per_min,
    )
    .map_err(Error::from)?;
    let actuators = Actuators {
        solenoid,
        relays,
        pumps,
    };

    // ── 5. Run ────────────────────────────────────────────────
    let mut controller = Controller::new(
        &config,
        sampler,
        actuators,
        Box::new(flags),
        Box::new(store),
        SystemClock,
    );
    controller.run()
}

fn load_config(path: &str) -> anyhow::Result<ReservoirConfig> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            serde_json::from_str(&text).with_context(|| format!("parsing config file {path}"))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("no config file at {path}; using defaults");
            Ok(ReservoirConfig::default())
        }
        Err(e) => Err(e).with_context(|| format!("reading config file {path}")),
    }
}

fn ensure_parent_dir(path: &str) -> anyhow::Result<()> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
    }
    Ok(())
}
