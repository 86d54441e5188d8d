//! Output commit/autocommit policy and validated set-point application.
//!
//! Every mutating command routes through [`autocommit`]: with the policy on,
//! the change reaches the regulation hardware immediately; with it off, the
//! operator is told the change is pending until an explicit `COMMIT`.
//!
//! Set-points arrive from two sources, an interactive text argument and a
//! direct numeric magnitude (front panel, boot). They are separate entry
//! points sharing one validated-apply routine, so neither path can bypass
//! the range check.

use core::fmt::Write as _;

use embedded_io::Write;

use crate::config::{CAP_CMAX, CAP_CMIN, CAP_VMAX, CAP_VMIN, OutputConfig, SystemConfig};
use crate::error::{Error, Result};
use crate::hal::Regulator;
use crate::numeric::{self, Milli};
use crate::state::RuntimeState;

/// Unconditionally push the current output configuration to the regulation
/// hardware, with the live CV/CC flag for PWM-direction selection.
pub fn commit<R: Regulator>(
    regulator: &mut R,
    system: &SystemConfig,
    output: &OutputConfig,
    state: &RuntimeState,
) {
    regulator.apply(output, system, state.constant_current);
}

/// Commit immediately when the autocommit policy is on; otherwise report
/// that the change is pending and leave the hardware untouched.
pub fn autocommit<S: Write, R: Regulator>(
    serial: &mut S,
    regulator: &mut R,
    system: &SystemConfig,
    output: &OutputConfig,
    state: &RuntimeState,
) -> Result<(), S::Error> {
    if system.autocommit {
        commit(regulator, system, output, state);
        Ok(())
    } else {
        serial
            .write_all(b"AUTOCOMMIT OFF: CHANGE PENDING ON COMMIT\r\n")
            .map_err(Error::Serial)
    }
}

#[derive(Debug, Clone, Copy)]
enum SetPoint {
    Voltage,
    Current,
}

impl SetPoint {
    const fn caps(self) -> (Milli, Milli) {
        match self {
            SetPoint::Voltage => (CAP_VMIN, CAP_VMAX),
            SetPoint::Current => (CAP_CMIN, CAP_CMAX),
        }
    }

    const fn label(self) -> &'static str {
        match self {
            SetPoint::Voltage => "VOLTAGE",
            SetPoint::Current => "CURRENT",
        }
    }

    const fn unit(self) -> char {
        match self {
            SetPoint::Voltage => 'V',
            SetPoint::Current => 'A',
        }
    }

    fn slot(self, output: &mut OutputConfig) -> &mut Milli {
        match self {
            SetPoint::Voltage => &mut output.vset,
            SetPoint::Current => &mut output.cset,
        }
    }
}

/// Range-check and store a requested magnitude. Boundary values are
/// accepted; anything outside leaves the configuration untouched.
fn apply_validated(point: SetPoint, output: &mut OutputConfig, value: u32) -> Option<Milli> {
    let (min, max) = point.caps();
    if value < min as u32 || value > max as u32 {
        return None;
    }
    let value = value as Milli;
    *point.slot(output) = value;
    Some(value)
}

fn set_from_text<S: Write, R: Regulator>(
    point: SetPoint,
    serial: &mut S,
    regulator: &mut R,
    system: &SystemConfig,
    output: &mut OutputConfig,
    state: &RuntimeState,
    text: &str,
) -> Result<(), S::Error> {
    // Malformed text short-circuits with no mutation and no message; the
    // transaction still ends with the DONE marker.
    let Some(requested) = numeric::parse_milli(text) else {
        return Ok(());
    };
    let Some(value) = apply_validated(point, output, requested) else {
        let mut line: heapless::String<44> = heapless::String::new();
        let _ = write!(line, "{} OUT OF THE ALLOWED RANGE\r\n", point.label());
        return serial.write_all(line.as_bytes()).map_err(Error::Serial);
    };
    autocommit(serial, regulator, system, output, state)?;
    let mut line: heapless::String<32> = heapless::String::new();
    let _ = write!(
        line,
        "{}: SET {}{}\r\n",
        point.label(),
        numeric::format_milli(value),
        point.unit()
    );
    serial.write_all(line.as_bytes()).map_err(Error::Serial)
}

fn set_direct<R: Regulator>(
    point: SetPoint,
    regulator: &mut R,
    system: &SystemConfig,
    output: &mut OutputConfig,
    state: &RuntimeState,
    value: Milli,
) -> bool {
    if apply_validated(point, output, value as u32).is_none() {
        return false;
    }
    if system.autocommit {
        commit(regulator, system, output, state);
    }
    true
}

/// Set the output voltage from operator text, range-checked and subject to
/// the autocommit policy. Echoes the applied value.
pub fn set_voltage_from_text<S: Write, R: Regulator>(
    serial: &mut S,
    regulator: &mut R,
    system: &SystemConfig,
    output: &mut OutputConfig,
    state: &RuntimeState,
    text: &str,
) -> Result<(), S::Error> {
    set_from_text(SetPoint::Voltage, serial, regulator, system, output, state, text)
}

/// Set the output current from operator text. See [`set_voltage_from_text`].
pub fn set_current_from_text<S: Write, R: Regulator>(
    serial: &mut S,
    regulator: &mut R,
    system: &SystemConfig,
    output: &mut OutputConfig,
    state: &RuntimeState,
    text: &str,
) -> Result<(), S::Error> {
    set_from_text(SetPoint::Current, serial, regulator, system, output, state, text)
}

/// Set the output voltage from a direct numeric magnitude (front panel or
/// boot path). Returns false and leaves the configuration untouched when the
/// value is out of range.
pub fn set_voltage_direct<R: Regulator>(
    regulator: &mut R,
    system: &SystemConfig,
    output: &mut OutputConfig,
    state: &RuntimeState,
    value: Milli,
) -> bool {
    set_direct(SetPoint::Voltage, regulator, system, output, state, value)
}

/// Set the output current from a direct numeric magnitude. See
/// [`set_voltage_direct`].
pub fn set_current_direct<R: Regulator>(
    regulator: &mut R,
    system: &SystemConfig,
    output: &mut OutputConfig,
    state: &RuntimeState,
    value: Milli,
) -> bool {
    set_direct(SetPoint::Current, regulator, system, output, state, value)
}
