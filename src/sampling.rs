//! Round-robin analog sampling.
//!
//! One converter is shared by three channels, visited in a fixed cyclic
//! order. Each completed conversion updates exactly one pair of
//! raw/calibrated fields in [`RuntimeState`] and kicks off the next channel.

use crate::config::SystemConfig;
use crate::hal::AnalogFrontEnd;
use crate::state::RuntimeState;

/// Sense channel of the analog front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    OutputCurrent,
    OutputVoltage,
    InputVoltage,
}

impl Channel {
    /// Channel of the first conversion started at boot.
    pub const FIRST: Channel = Channel::InputVoltage;

    /// Next channel in the fixed cycle
    /// {output current, output voltage, input voltage}.
    pub const fn next(self) -> Channel {
        match self {
            Channel::OutputCurrent => Channel::OutputVoltage,
            Channel::OutputVoltage => Channel::InputVoltage,
            Channel::InputVoltage => Channel::OutputCurrent,
        }
    }
}

/// One sampling step: consume a completed conversion if there is one,
/// update the matching [`RuntimeState`] fields through that channel's
/// calibration pair, and start the next channel. A no-op while the
/// converter is busy.
pub fn poll<A: AnalogFrontEnd>(afe: &mut A, system: &SystemConfig, state: &mut RuntimeState) {
    let Some((channel, raw)) = afe.completed() else {
        return;
    };
    match channel {
        Channel::OutputCurrent => {
            state.cout_raw = raw;
            state.cout = system.cout_adc.raw_to_milli(raw);
        }
        Channel::OutputVoltage => {
            state.vout_raw = raw;
            state.vout = system.vout_adc.raw_to_milli(raw);
        }
        Channel::InputVoltage => {
            state.vin_raw = raw;
            state.vin = system.vin_adc.raw_to_milli(raw);
        }
    }
    afe.start(channel.next());
}
