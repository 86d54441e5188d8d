//! Persistent configuration records, calibration pairs, and their
//! manufacturer defaults.
//!
//! Two records exist: [`SystemConfig`] (identity, policy flags, and the five
//! calibration pairs) and [`OutputConfig`] (the desired set-points). They
//! are loaded once at boot, mutated by command handlers, and written back to
//! non-volatile storage only on an explicit `SAVE`.

use crate::error::StorageError;
use crate::hal::Storage;
use crate::numeric::{self, Fixed, FIXED_ONE, Milli};

/// Device model reported by the `SYSTEM` command and the boot banner.
pub const MODEL: &str = "BPS3606";

/// Firmware version reported by the `SYSTEM` command and the boot banner.
pub const FW_VERSION: &str = "1.0.0";

/// Voltage set-point range and front-panel step, in millivolts.
pub const CAP_VMIN: Milli = 10;
pub const CAP_VMAX: Milli = 36_000;
pub const CAP_VSTEP: Milli = 10;

/// Current set-point range and front-panel step, in milliamps.
pub const CAP_CMIN: Milli = 1;
pub const CAP_CMAX: Milli = 6_000;
pub const CAP_CSTEP: Milli = 1;

/// Capacity of the device name field, bytes.
pub const NAME_LEN: usize = 16;

/// Affine coefficients mapping a raw count to a physical magnitude
/// (ADC direction) or a magnitude back to a duty count (PWM direction).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationPair {
    /// Slope, Q22.10.
    pub a: Fixed,
    /// Offset, Q22.10.
    pub b: Fixed,
}

impl CalibrationPair {
    pub const fn new(a: Fixed, b: Fixed) -> Self {
        Self { a, b }
    }

    /// Convert a raw ADC count to milli units.
    pub const fn raw_to_milli(&self, raw: u16) -> Milli {
        numeric::affine(raw, self.a, self.b)
    }

    /// Convert a milli-unit target back to the nearest raw/duty count.
    pub const fn milli_to_raw(&self, value: Milli) -> u16 {
        numeric::affine_inverse(value, self.a, self.b)
    }
}

/// Nominal slope for a channel scaled down by `divider`, assuming the
/// 3.3 V reference and the 10-bit converter.
const fn nominal_slope(divider: i32) -> Fixed {
    3300 * divider * FIXED_ONE / 1024
}

/// System-wide configuration record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemConfig {
    /// Device name, printable ASCII.
    pub name: heapless::String<NAME_LEN>,
    /// Enable the output immediately after boot.
    pub default_on: bool,
    /// Current output-enable flag. Volatile intent; persisted as part of
    /// the record but re-derived from `default_on` at boot.
    pub output: bool,
    /// Push configuration changes to the hardware as they are made.
    pub autocommit: bool,
    /// Input voltage sense calibration.
    pub vin_adc: CalibrationPair,
    /// Output voltage sense calibration.
    pub vout_adc: CalibrationPair,
    /// Output current sense calibration.
    pub cout_adc: CalibrationPair,
    /// Output voltage PWM calibration.
    pub vout_pwm: CalibrationPair,
    /// Output current PWM calibration.
    pub cout_pwm: CalibrationPair,
}

impl Default for SystemConfig {
    /// Manufacturer-safe defaults: output off, autocommit on, nominal
    /// calibration slopes with zero offsets.
    fn default() -> Self {
        let mut name = heapless::String::new();
        let _ = name.push_str("Unnamed");
        Self {
            name,
            default_on: false,
            output: false,
            autocommit: true,
            // Voltage senses sit behind a 16:1 divider, the current shunt
            // amplifier behind 2:1.
            vin_adc: CalibrationPair::new(nominal_slope(16), 0),
            vout_adc: CalibrationPair::new(nominal_slope(16), 0),
            cout_adc: CalibrationPair::new(nominal_slope(2), 0),
            vout_pwm: CalibrationPair::new(nominal_slope(16), 0),
            cout_pwm: CalibrationPair::new(nominal_slope(2), 0),
        }
    }
}

impl SystemConfig {
    /// Replace the device name. Non-printable bytes become `.`; input past
    /// the field width is truncated.
    pub fn set_name(&mut self, raw: &str) {
        self.name.clear();
        for byte in raw.bytes().take(NAME_LEN) {
            let ch = if (0x20..=0x7e).contains(&byte) {
                byte as char
            } else {
                '.'
            };
            let _ = self.name.push(ch);
        }
    }
}

/// Desired output set-points, persisted independently from [`SystemConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    /// Set-voltage, millivolts, within [`CAP_VMIN`]..=[`CAP_VMAX`].
    pub vset: Milli,
    /// Set-current, milliamps, within [`CAP_CMIN`]..=[`CAP_CMAX`].
    pub cset: Milli,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            vset: 5_000,
            cset: 500,
        }
    }
}

/// Load the system record, falling back to defaults when it is absent or
/// corrupt. Load failure is non-fatal; the in-memory record is authoritative
/// for the rest of the session.
pub fn load_system<N: Storage>(storage: &mut N) -> SystemConfig {
    storage.load_system().unwrap_or_default()
}

/// Load the output record, falling back to defaults. See [`load_system`].
pub fn load_output<N: Storage>(storage: &mut N) -> OutputConfig {
    storage.load_output().unwrap_or_default()
}

/// Save both records. Both writes are always attempted; a failure on either
/// side is reported as one combined failure, without rolling back the side
/// that succeeded.
pub fn save<N: Storage>(
    storage: &mut N,
    system: &SystemConfig,
    output: &OutputConfig,
) -> Result<(), StorageError> {
    let system_result = storage.save_system(system);
    let output_result = storage.save_output(output);
    system_result.and(output_result)
}
