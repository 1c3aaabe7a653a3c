//! Property tests for ordering and sequencing invariants of the core
//! data structures.

use std::time::Duration;

use proptest::prelude::*;

use hydrostat::adapters::sim::{MemDatastore, SimAnalog, SimClock, SimPin, SimProbe, SimThermal};
use hydrostat::config::ReservoirConfig;
use hydrostat::pace::{CyclePacer, WINDOW};
use hydrostat::requests::plan::{plan, Intent, PRIORITY};
use hydrostat::requests::store::PendingRequest;
use hydrostat::sampler::{SamplingCycle, STEP_COUNT};
use hydrostat::sensors::chemical::{ec_scale, ph_scale, ChemicalProbe};
use hydrostat::sensors::level::WaterLevelSensor;
use hydrostat::sensors::temperature::TempSensor;

// ── Pacer: trimmed mean is order-independent ─────────────────

fn durations_and_permutation() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    proptest::collection::vec(0.1f64..3600.0, WINDOW).prop_flat_map(|samples| {
        let original = samples.clone();
        (Just(original), Just(samples).prop_shuffle())
    })
}

proptest! {
    /// Feeding the same window of durations in any order produces the
    /// identical wait-time estimate.
    #[test]
    fn pacer_estimate_is_order_independent(
        (original, shuffled) in durations_and_permutation(),
    ) {
        let mut a = CyclePacer::new(900.0);
        let mut b = CyclePacer::new(900.0);
        for secs in &original {
            a.record(Duration::from_secs_f64(*secs));
        }
        for secs in &shuffled {
            b.record(Duration::from_secs_f64(*secs));
        }
        prop_assert_eq!(a.estimate_secs(), b.estimate_secs());
        prop_assert_eq!(a.idle_budget(), b.idle_budget());
    }
}

// ── Planner: table order wins, arrival order breaks ties ─────

fn arb_request() -> impl Strategy<Value = PendingRequest> {
    let names = proptest::sample::select(vec![
        ("level", "drain"),
        ("level", "set"),
        ("level", "fill"),
        ("ec", "nute1"),
        ("ec", "nute2"),
        ("ec", "nute3"),
        ("ec", "nute4"),
        ("ph", "up"),
        ("ph", "down"),
        // Outside the vocabulary:
        ("aux", "toggle"),
        ("ec", "nute9"),
        ("lamp", "on"),
    ]);
    (names, 0.0f64..100.0).prop_map(|((device, action), value)| PendingRequest {
        device: device.to_string(),
        action: action.to_string(),
        value,
    })
}

fn table_position(intent: Intent) -> usize {
    PRIORITY
        .iter()
        .position(|slot| *slot == intent)
        .expect("every intent has a table slot")
}

proptest! {
    #[test]
    fn plan_is_table_ordered_stable_and_complete(
        pending in proptest::collection::vec(arb_request(), 0..20),
    ) {
        let planned = plan(&pending);

        // Table order is monotone across the plan.
        for pair in planned.windows(2) {
            prop_assert!(table_position(pair[0].intent) <= table_position(pair[1].intent));
        }

        // Every recognized request is planned exactly once; nothing else is.
        let recognized = pending
            .iter()
            .filter(|r| Intent::from_names(&r.device, &r.action).is_some())
            .count();
        prop_assert_eq!(planned.len(), recognized);

        // Within a slot, arrival order survives.
        for intent in PRIORITY {
            let arrivals: Vec<f64> = pending
                .iter()
                .filter(|r| Intent::from_names(&r.device, &r.action) == Some(intent))
                .map(|r| r.value)
                .collect();
            let planned_values: Vec<f64> = planned
                .iter()
                .filter(|p| p.intent == intent)
                .map(|p| p.value)
                .collect();
            prop_assert_eq!(arrivals, planned_values);
        }
    }
}

// ── Sampler: the chain never short-circuits ──────────────────

fn probe(fail: bool, value: f64) -> SimProbe {
    if fail {
        // Empty script with no steady value: every query fails.
        SimProbe::scripted(Vec::new())
    } else {
        SimProbe::steady(value)
    }
}

proptest! {
    /// Any combination of failing sensors still yields a full cycle:
    /// all four steps visited, failures degraded to the zero sentinel,
    /// one error record per failed step.
    #[test]
    fn cycle_always_visits_all_steps(
        fail_ph in any::<bool>(),
        fail_ec in any::<bool>(),
        fail_level in any::<bool>(),
        fail_temp in any::<bool>(),
    ) {
        let config = ReservoirConfig::default();
        let clock = SimClock::new();
        let mut store = MemDatastore::new();

        let adc = if fail_level {
            SimAnalog::failing()
        } else {
            SimAnalog::steady(1.2)
        };
        let thermal = if fail_temp {
            SimThermal::failing()
        } else {
            SimThermal::steady(66.2)
        };

        let mut cycle = SamplingCycle::new(
            ChemicalProbe::new("ph", probe(fail_ph, 6.018), config.probe_max_attempts, ph_scale),
            ChemicalProbe::new("ec", probe(fail_ec, 2460.0), config.probe_max_attempts, ec_scale),
            WaterLevelSensor::new(adc, SimPin::new(), &config),
            TempSensor::new(thermal, config.temp_decimals),
        );

        let results = cycle.cycle(&mut store, &clock);
        prop_assert_eq!(results.len(), STEP_COUNT);

        let failures =
            usize::from(fail_ph) + usize::from(fail_ec) + usize::from(fail_level) + usize::from(fail_temp);
        prop_assert_eq!(store.errors.len(), failures);

        // Level persists two records (gallons + volts); the rest one each.
        let expected_values = usize::from(!fail_ph)
            + usize::from(!fail_ec)
            + 2 * usize::from(!fail_level)
            + usize::from(!fail_temp);
        prop_assert_eq!(store.values.len(), expected_values);
    }
}
