//! Actuator subsystem — fail-safe drivers for everything that moves water.
//!
//! Three driver families: the fill solenoid valve, the peristaltic
//! dosing pumps, and the auxiliary relay bank. Every driver owns exactly
//! one hardware output for the process lifetime, tracks its last known
//! state in memory as the authority, and forces the safe (de-energized)
//! state on construction and on `Drop`, whichever way the process exits.

pub mod pump;
pub mod relay;
pub mod solenoid;

use embedded_hal::digital::OutputPin;

use pump::PumpSet;
use relay::RelayBank;
use solenoid::Solenoid;

/// Every actuator on the rig, owned together so the request executor can
/// borrow them as one unit.
pub struct Actuators<P: OutputPin> {
    pub solenoid: Solenoid<P>,
    pub relays: RelayBank<P>,
    pub pumps: PumpSet<P>,
}
