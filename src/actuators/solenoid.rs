//! Reservoir fill solenoid valve (12 V coil behind a logic-level MOSFET).
//!
//! The valve is normally closed: a de-energized coil springs shut, which
//! is the safe posture for a water inlet. Open/close are idempotent:
//! the in-memory valve state is authoritative and a repeated command is
//! a no-op, so polling loops can command "open" every iteration without
//! hammering the coil driver.

use embedded_hal::digital::OutputPin;
use log::{error, info};

use crate::error::ActuatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveState {
    Open,
    Closed,
}

pub struct Solenoid<P: OutputPin> {
    pin: P,
    state: ValveState,
    // "Fail open" refers to the driving circuit, not the valve: an open
    // circuit de-energizes the coil and the valve springs closed.
    fail_open: bool,
}

impl<P: OutputPin> Solenoid<P> {
    /// Drives the coil to the safe state immediately.
    pub fn new(mut pin: P, fail_open: bool) -> Result<Self, ActuatorError> {
        let state = if fail_open {
            pin.set_low()
                .map_err(|_| ActuatorError::SwitchWrite("solenoid"))?;
            ValveState::Closed
        } else {
            pin.set_high()
                .map_err(|_| ActuatorError::SwitchWrite("solenoid"))?;
            ValveState::Open
        };

        Ok(Self {
            pin,
            state,
            fail_open,
        })
    }

    /// Energize the coil. No-op if already open.
    pub fn open(&mut self) -> Result<(), ActuatorError> {
        if self.state == ValveState::Open {
            return Ok(());
        }
        self.pin
            .set_high()
            .map_err(|_| ActuatorError::SwitchWrite("solenoid"))?;
        self.state = ValveState::Open;
        info!("solenoid: open");
        Ok(())
    }

    /// De-energize the coil. No-op if already closed.
    pub fn close(&mut self) -> Result<(), ActuatorError> {
        if self.state == ValveState::Closed {
            return Ok(());
        }
        self.pin
            .set_low()
            .map_err(|_| ActuatorError::SwitchWrite("solenoid"))?;
        self.state = ValveState::Closed;
        info!("solenoid: closed");
        Ok(())
    }

    pub fn state(&self) -> ValveState {
        self.state
    }
}

impl<P: OutputPin> Drop for Solenoid<P> {
    fn drop(&mut self) {
        let result = if self.fail_open {
            self.pin.set_low()
        } else {
            self.pin.set_high()
        };
        if result.is_err() {
            error!("solenoid: failed to reach safe state on teardown");
        }
    }
}
