//! Serial command interpreter.
//!
//! Input arrives one byte at a time from the serial receive path and is
//! accumulated into a single line buffer; a line terminator marks the line
//! ready. The dispatcher owns clearing the buffer, so a new line cannot
//! begin accumulating mid-dispatch. Every dispatch — success, validation
//! failure, or unknown command — ends the transaction with a `DONE` marker
//! and a reset buffer.
//!
//! Two lookup tables drive dispatch: zero-argument queries matched against
//! the whole line, and argument-taking setters matched against the verb in
//! front of the first space. Matching is exact and case-sensitive.

use core::fmt::Write as _;
use core::str::FromStr;

use embedded_io::Write;
use strum_macros::EnumString;

use crate::config::{
    self, CAP_CMAX, CAP_CMIN, CAP_CSTEP, CAP_VMAX, CAP_VMIN, CAP_VSTEP, CalibrationPair,
    FW_VERSION, MODEL, OutputConfig, SystemConfig,
};
use crate::error::{Error, Result};
use crate::hal::{Regulator, Storage};
use crate::numeric::{self, Fixed, Milli};
use crate::output;
use crate::state::RuntimeState;

/// Line buffer capacity, bytes. Bytes past this are dropped; the mangled
/// line then fails dispatch as an unknown command.
pub const LINE_CAP: usize = 64;

/// Shared, mutably-borrowed state handed to the interpreter for the
/// duration of one dispatch.
pub struct Session<'a, S, R, N> {
    pub serial: &'a mut S,
    pub regulator: &'a mut R,
    pub storage: &'a mut N,
    pub system: &'a mut SystemConfig,
    pub output: &'a mut OutputConfig,
    pub state: &'a RuntimeState,
}

/// Zero-argument commands, matched against the full line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
enum Query {
    #[strum(serialize = "SYSTEM")]
    System,
    #[strum(serialize = "CALIBRATION")]
    Calibration,
    #[strum(serialize = "LIMITS")]
    Limits,
    #[strum(serialize = "CONFIG")]
    Config,
    #[strum(serialize = "STATUS")]
    Status,
    #[strum(serialize = "RSTATUS")]
    RawStatus,
    #[strum(serialize = "COMMIT")]
    Commit,
    #[strum(serialize = "SAVE")]
    Save,
    #[strum(serialize = "LOAD")]
    Load,
    #[strum(serialize = "RESTORE")]
    Restore,
}

/// Argument-taking commands, matched against the verb before the first
/// space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
enum Setter {
    #[strum(serialize = "SNAME")]
    Name,
    #[strum(serialize = "OUTPUT")]
    Output,
    #[strum(serialize = "VOLTAGE")]
    Voltage,
    #[strum(serialize = "CURRENT")]
    Current,
    #[strum(serialize = "AUTOCOMMIT")]
    Autocommit,
    #[strum(serialize = "CALVINADCA")]
    CalVinAdcA,
    #[strum(serialize = "CALVINADCB")]
    CalVinAdcB,
    #[strum(serialize = "CALVOUTADCA")]
    CalVoutAdcA,
    #[strum(serialize = "CALVOUTADCB")]
    CalVoutAdcB,
    #[strum(serialize = "CALCOUTADCA")]
    CalCoutAdcA,
    #[strum(serialize = "CALCOUTADCB")]
    CalCoutAdcB,
    #[strum(serialize = "CALVOUTPWMA")]
    CalVoutPwmA,
    #[strum(serialize = "CALVOUTPWMB")]
    CalVoutPwmB,
    #[strum(serialize = "CALCOUTPWMA")]
    CalCoutPwmA,
    #[strum(serialize = "CALCOUTPWMB")]
    CalCoutPwmB,
}

/// One raw calibration coefficient, addressed by channel, stage, and term.
#[derive(Debug, Clone, Copy)]
enum CalTarget {
    VinAdcA,
    VinAdcB,
    VoutAdcA,
    VoutAdcB,
    CoutAdcA,
    CoutAdcB,
    VoutPwmA,
    VoutPwmB,
    CoutPwmA,
    CoutPwmB,
}

impl CalTarget {
    fn slot(self, system: &mut SystemConfig) -> (&mut Fixed, &'static str) {
        match self {
            CalTarget::VinAdcA => (&mut system.vin_adc.a, "VIN ADC A"),
            CalTarget::VinAdcB => (&mut system.vin_adc.b, "VIN ADC B"),
            CalTarget::VoutAdcA => (&mut system.vout_adc.a, "VOUT ADC A"),
            CalTarget::VoutAdcB => (&mut system.vout_adc.b, "VOUT ADC B"),
            CalTarget::CoutAdcA => (&mut system.cout_adc.a, "COUT ADC A"),
            CalTarget::CoutAdcB => (&mut system.cout_adc.b, "COUT ADC B"),
            CalTarget::VoutPwmA => (&mut system.vout_pwm.a, "VOUT PWM A"),
            CalTarget::VoutPwmB => (&mut system.vout_pwm.b, "VOUT PWM B"),
            CalTarget::CoutPwmA => (&mut system.cout_pwm.a, "COUT PWM A"),
            CalTarget::CoutPwmB => (&mut system.cout_pwm.b, "COUT PWM B"),
        }
    }
}

/// Line accumulator and dispatcher.
///
/// States: accumulating (default), line-ready (terminator seen), and
/// dispatching (inside [`Interpreter::dispatch`]).
#[derive(Debug, Default)]
pub struct Interpreter {
    line: heapless::Vec<u8, LINE_CAP>,
    ready: bool,
}

impl Interpreter {
    pub const fn new() -> Self {
        Self {
            line: heapless::Vec::new(),
            ready: false,
        }
    }

    /// Receive-path entry point: append one byte. `\n` marks the line
    /// ready; further bytes are ignored until the dispatcher clears the
    /// buffer.
    pub fn push_byte(&mut self, byte: u8) {
        if self.ready {
            return;
        }
        if byte == b'\n' {
            self.ready = true;
            return;
        }
        let _ = self.line.push(byte);
    }

    pub fn line_ready(&self) -> bool {
        self.ready
    }

    /// Dispatch the accumulated line. Always terminates the transaction
    /// with `DONE` and resets the buffer, whatever the outcome.
    pub fn dispatch<S: Write, R: Regulator, N: Storage>(
        &mut self,
        session: &mut Session<'_, S, R, N>,
    ) -> Result<(), S::Error> {
        let result = {
            let line = core::str::from_utf8(&self.line).unwrap_or("");
            let line = line.trim_end_matches('\r');
            session
                .run_line(line)
                .and_then(|_| session.write_str("DONE\r\n"))
        };
        self.line.clear();
        self.ready = false;
        result
    }
}

impl<S: Write, R: Regulator, N: Storage> Session<'_, S, R, N> {
    fn run_line(&mut self, line: &str) -> Result<(), S::Error> {
        #[cfg(feature = "debug-cmds")]
        if line == "STUCK" {
            return self.run_stuck();
        }
        if let Ok(query) = Query::from_str(line) {
            return self.run_query(query);
        }
        match line.split_once(' ') {
            None => self.write_str("UNKNOWN COMMAND\r\n"),
            Some((verb, arg)) => match Setter::from_str(verb) {
                Ok(setter) => self.run_setter(setter, arg),
                Err(_) => self.write_str("UNKNOWN COMMAND!\r\n"),
            },
        }
    }

    fn run_query(&mut self, query: Query) -> Result<(), S::Error> {
        match query {
            Query::System => {
                let mut line: heapless::String<64> = heapless::String::new();
                let _ = write!(line, "MODEL: {MODEL}\r\nVERSION: {FW_VERSION}\r\n");
                let _ = write!(line, "NAME: {}\r\n", self.system.name);
                self.write_str(&line)?;
                self.write_onoff("ONSTARTUP: ", self.system.default_on)?;
                self.write_onoff("AUTOCOMMIT: ", self.system.autocommit)
            }
            Query::Calibration => {
                self.write_pair("CALIBRATE VIN ADC: ", self.system.vin_adc)?;
                self.write_pair("CALIBRATE VOUT ADC: ", self.system.vout_adc)?;
                self.write_pair("CALIBRATE COUT ADC: ", self.system.cout_adc)?;
                self.write_pair("CALIBRATE VOUT PWM: ", self.system.vout_pwm)?;
                self.write_pair("CALIBRATE COUT PWM: ", self.system.cout_pwm)
            }
            Query::Limits => {
                self.write_str("LIMITS:\r\n")?;
                self.write_milli("VMIN: ", CAP_VMIN, 'V')?;
                self.write_milli("VMAX: ", CAP_VMAX, 'V')?;
                self.write_milli("VSTEP: ", CAP_VSTEP, 'V')?;
                self.write_milli("CMIN: ", CAP_CMIN, 'A')?;
                self.write_milli("CMAX: ", CAP_CMAX, 'A')?;
                self.write_milli("CSTEP: ", CAP_CSTEP, 'A')
            }
            Query::Config => {
                self.write_str("CONFIG:\r\n")?;
                self.write_onoff("OUTPUT: ", self.system.output)?;
                self.write_milli("VSET: ", self.output.vset, 'V')?;
                self.write_milli("CSET: ", self.output.cset, 'A')
            }
            Query::Status => {
                self.write_str("STATUS:\r\n")?;
                self.write_onoff("OUTPUT: ", self.system.output)?;
                self.write_milli("VIN: ", self.state.vin, 'V')?;
                self.write_milli("VOUT: ", self.state.vout, 'V')?;
                self.write_milli("COUT: ", self.state.cout, 'A')?;
                let mode = if self.state.constant_current {
                    "CONSTANT: CURRENT\r\n"
                } else {
                    "CONSTANT: VOLTAGE\r\n"
                };
                self.write_str(mode)
            }
            Query::RawStatus => {
                self.write_str("RSTATUS:\r\n")?;
                self.write_int("VIN ADC: ", self.state.vin_raw)?;
                self.write_int("VOUT ADC: ", self.state.vout_raw)?;
                self.write_int("COUT ADC: ", self.state.cout_raw)
            }
            Query::Commit => {
                output::commit(self.regulator, self.system, self.output, self.state);
                Ok(())
            }
            Query::Save => {
                let message = match config::save(self.storage, self.system, self.output) {
                    Ok(()) => "SAVED\r\n",
                    Err(_) => "ERROR SAVING\r\n",
                };
                self.write_str(message)
            }
            Query::Load => {
                *self.system = config::load_system(self.storage);
                *self.output = config::load_output(self.storage);
                self.autocommit()
            }
            Query::Restore => {
                *self.system = SystemConfig::default();
                *self.output = OutputConfig::default();
                self.autocommit()
            }
        }
    }

    fn run_setter(&mut self, setter: Setter, arg: &str) -> Result<(), S::Error> {
        match setter {
            Setter::Name => {
                self.system.set_name(arg);
                let mut line: heapless::String<32> = heapless::String::new();
                let _ = write!(line, "SNAME: {}\r\n", self.system.name);
                self.write_str(&line)
            }
            Setter::Output => self.run_output(arg),
            Setter::Voltage => output::set_voltage_from_text(
                self.serial,
                self.regulator,
                self.system,
                self.output,
                self.state,
                arg,
            ),
            Setter::Current => output::set_current_from_text(
                self.serial,
                self.regulator,
                self.system,
                self.output,
                self.state,
                arg,
            ),
            Setter::Autocommit => self.run_autocommit(arg),
            Setter::CalVinAdcA => self.run_cal(CalTarget::VinAdcA, arg),
            Setter::CalVinAdcB => self.run_cal(CalTarget::VinAdcB, arg),
            Setter::CalVoutAdcA => self.run_cal(CalTarget::VoutAdcA, arg),
            Setter::CalVoutAdcB => self.run_cal(CalTarget::VoutAdcB, arg),
            Setter::CalCoutAdcA => self.run_cal(CalTarget::CoutAdcA, arg),
            Setter::CalCoutAdcB => self.run_cal(CalTarget::CoutAdcB, arg),
            Setter::CalVoutPwmA => self.run_cal(CalTarget::VoutPwmA, arg),
            Setter::CalVoutPwmB => self.run_cal(CalTarget::VoutPwmB, arg),
            Setter::CalCoutPwmA => self.run_cal(CalTarget::CoutPwmA, arg),
            Setter::CalCoutPwmB => self.run_cal(CalTarget::CoutPwmB, arg),
        }
    }

    fn run_output(&mut self, arg: &str) -> Result<(), S::Error> {
        match arg {
            "0" => {
                self.system.output = false;
                self.write_str("OUTPUT: OFF\r\n")?;
            }
            "1" => {
                self.system.output = true;
                self.write_str("OUTPUT: ON\r\n")?;
            }
            _ => {
                // Written in pieces: the echoed argument can be as long as
                // the line buffer allows.
                self.write_str("OUTPUT takes either 0 for OFF or 1 for ON, received: \"")?;
                self.write_str(arg)?;
                return self.write_str("\"\r\n");
            }
        }
        self.autocommit()
    }

    fn run_autocommit(&mut self, arg: &str) -> Result<(), S::Error> {
        match arg {
            "1" | "YES" => {
                self.system.autocommit = true;
                self.write_str("AUTOCOMMIT: YES\r\n")
            }
            "0" | "NO" => {
                self.system.autocommit = false;
                self.write_str("AUTOCOMMIT: NO\r\n")
            }
            _ => self.write_str("UNKNOWN ARG. USE 1 or 0.\r\n"),
        }
    }

    /// Shared handler for the ten calibration-coefficient setters. Parse
    /// failure reports generically and leaves the coefficient untouched.
    fn run_cal(&mut self, target: CalTarget, arg: &str) -> Result<(), S::Error> {
        match numeric::parse_fixed(arg) {
            None => self.write_str("FAILED TO PARSE\r\n"),
            Some(value) => {
                let (slot, label) = target.slot(self.system);
                *slot = value;
                let mut line: heapless::String<40> = heapless::String::new();
                let _ = write!(line, "CALIBRATION SET {label}\r\n");
                self.write_str(&line)
            }
        }
    }

    #[cfg(feature = "debug-cmds")]
    fn run_stuck(&mut self) -> Result<(), S::Error> {
        // Deliberately stops servicing the watchdog so it can be exercised.
        self.write_str("STUCK\r\n")?;
        self.serial.flush().map_err(Error::Serial)?;
        loop {
            core::hint::spin_loop();
        }
    }

    fn autocommit(&mut self) -> Result<(), S::Error> {
        output::autocommit(
            self.serial,
            self.regulator,
            self.system,
            self.output,
            self.state,
        )
    }

    fn write_str(&mut self, text: &str) -> Result<(), S::Error> {
        self.serial.write_all(text.as_bytes()).map_err(Error::Serial)
    }

    fn write_onoff(&mut self, prefix: &str, on: bool) -> Result<(), S::Error> {
        self.write_str(prefix)?;
        self.write_str(if on { "ON\r\n" } else { "OFF\r\n" })
    }

    fn write_milli(&mut self, prefix: &str, value: Milli, unit: char) -> Result<(), S::Error> {
        let mut line: heapless::String<32> = heapless::String::new();
        let _ = write!(line, "{}{}{}\r\n", prefix, numeric::format_milli(value), unit);
        self.write_str(&line)
    }

    fn write_int(&mut self, prefix: &str, value: u16) -> Result<(), S::Error> {
        let mut line: heapless::String<24> = heapless::String::new();
        let _ = write!(line, "{prefix}{value}\r\n");
        self.write_str(&line)
    }

    fn write_pair(&mut self, prefix: &str, pair: CalibrationPair) -> Result<(), S::Error> {
        let mut line: heapless::String<48> = heapless::String::new();
        let _ = write!(
            line,
            "{}{}/{}\r\n",
            prefix,
            numeric::format_fixed(pair.a),
            numeric::format_fixed(pair.b)
        );
        self.write_str(&line)
    }
}
