//! Volatile runtime state, rebuilt every control-loop iteration.

use crate::numeric::Milli;

/// Latest raw and calibrated samples plus the mirrored regulation mode.
///
/// Never persisted; the only cross-iteration guarantee is that each field
/// reflects the most recent sample of its channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeState {
    /// Raw ADC count, input voltage channel.
    pub vin_raw: u16,
    /// Raw ADC count, output voltage channel.
    pub vout_raw: u16,
    /// Raw ADC count, output current channel.
    pub cout_raw: u16,
    /// Calibrated input voltage, millivolts.
    pub vin: Milli,
    /// Calibrated output voltage, millivolts.
    pub vout: Milli,
    /// Calibrated output current, milliamps.
    pub cout: Milli,
    /// Mirror of the regulation hardware's CV/CC sense line. True while the
    /// supply is limiting current.
    pub constant_current: bool,
}
