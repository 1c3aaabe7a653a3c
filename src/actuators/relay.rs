//! Auxiliary relay bank (drain pump, air stones, grow lights).
//!
//! One coil pin per channel on a shared multi-channel relay board.
//! `all_off` forces every channel safe in a single call; teardown runs
//! it unconditionally.

use embedded_hal::digital::OutputPin;
use log::{error, info};

use crate::error::ActuatorError;

pub struct RelayBank<P: OutputPin> {
    coils: Vec<P>,
    states: Vec<bool>,
}

impl<P: OutputPin> RelayBank<P> {
    /// Drives every coil to the de-energized state immediately.
    pub fn new(mut coils: Vec<P>) -> Result<Self, ActuatorError> {
        for coil in &mut coils {
            coil.set_low()
                .map_err(|_| ActuatorError::SwitchWrite("relay bank"))?;
        }
        let states = vec![false; coils.len()];
        Ok(Self { coils, states })
    }

    pub fn channel_count(&self) -> u8 {
        self.coils.len() as u8
    }

    pub fn is_on(&self, channel: u8) -> bool {
        self.states.get(usize::from(channel)).copied().unwrap_or(false)
    }

    /// Energize or release one channel.
    pub fn set(&mut self, channel: u8, on: bool) -> Result<(), ActuatorError> {
        let idx = usize::from(channel);
        let coil = self
            .coils
            .get_mut(idx)
            .ok_or(ActuatorError::NoSuchChannel(channel))?;

        let result = if on { coil.set_high() } else { coil.set_low() };
        result.map_err(|_| ActuatorError::SwitchWrite("relay bank"))?;

        self.states[idx] = on;
        info!("relay {channel}: {}", if on { "on" } else { "off" });
        Ok(())
    }

    /// Force every channel to the safe state in one call.
    ///
    /// Attempts all channels even when one write fails, then reports the
    /// failure once.
    pub fn all_off(&mut self) -> Result<(), ActuatorError> {
        let mut failed = false;
        for (idx, coil) in self.coils.iter_mut().enumerate() {
            if coil.set_low().is_err() {
                failed = true;
            } else {
                self.states[idx] = false;
            }
        }
        if failed {
            Err(ActuatorError::SwitchWrite("relay bank"))
        } else {
            Ok(())
        }
    }
}

impl<P: OutputPin> Drop for RelayBank<P> {
    fn drop(&mut self) {
        if self.all_off().is_err() {
            error!("relay bank: channels left energized on teardown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sim::SimPin;

    fn bank(n: usize) -> (RelayBank<SimPin>, Vec<SimPin>) {
        let pins: Vec<SimPin> = (0..n).map(|_| SimPin::new()).collect();
        let handles = pins.clone();
        (RelayBank::new(pins).unwrap(), handles)
    }

    #[test]
    fn channels_start_deenergized() {
        let (bank, handles) = bank(4);
        assert_eq!(bank.channel_count(), 4);
        assert!(handles.iter().all(|p| !p.is_high()));
    }

    #[test]
    fn set_drives_one_channel() {
        let (mut bank, handles) = bank(4);
        bank.set(2, true).unwrap();
        assert!(bank.is_on(2));
        assert!(handles[2].is_high());
        assert!(!handles[1].is_high());

        bank.set(2, false).unwrap();
        assert!(!bank.is_on(2));
        assert!(!handles[2].is_high());
    }

    #[test]
    fn unknown_channel_is_an_error() {
        let (mut bank, _handles) = bank(2);
        assert_eq!(
            bank.set(5, true).unwrap_err(),
            ActuatorError::NoSuchChannel(5)
        );
    }

    #[test]
    fn all_off_releases_every_channel() {
        let (mut bank, handles) = bank(3);
        bank.set(0, true).unwrap();
        bank.set(2, true).unwrap();
        bank.all_off().unwrap();
        assert!(handles.iter().all(|p| !p.is_high()));
        assert!(!bank.is_on(0) && !bank.is_on(2));
    }

    #[test]
    fn drop_forces_all_channels_safe() {
        let handles;
        {
            let (mut bank, h) = bank(3);
            handles = h;
            bank.set(1, true).unwrap();
        }
        assert!(handles.iter().all(|p| !p.is_high()));
    }
}
