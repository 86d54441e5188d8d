//! The cooperative control loop.
//!
//! One unbounded single-threaded loop owns all three state aggregates and
//! drives the collaborators in a fixed order each iteration: watchdog first,
//! then regulation-mode sense and analog sampling, then display and front
//! panel, then at most one fully dispatched command line. Nothing here
//! blocks; the hardware watchdog is the only timeout and a full restart is
//! the only recovery for a stuck loop.

use core::fmt::Write as _;

use embedded_io::{Error as _, ErrorKind, Read, Write};

use crate::command::{Interpreter, Session};
use crate::config::{self, FW_VERSION, MODEL, OutputConfig, SystemConfig};
use crate::error::{Error, Result};
use crate::hal::{AnalogFrontEnd, Display, FrontPanel, Regulator, Storage, Watchdog};
use crate::output;
use crate::provision::{self, BootAction};
use crate::sampling::{self, Channel};
use crate::state::RuntimeState;

/// The hardware collaborators, bundled.
pub struct Board<S, A, R, P, D, W, N> {
    pub serial: S,
    pub afe: A,
    pub regulator: R,
    pub panel: P,
    pub display: D,
    pub watchdog: W,
    pub storage: N,
}

/// The control-loop runtime: board plus the singleton state aggregates.
pub struct Runtime<S, A, R, P, D, W, N> {
    board: Board<S, A, R, P, D, W, N>,
    system: SystemConfig,
    output: OutputConfig,
    state: RuntimeState,
    interpreter: Interpreter,
}

impl<S, A, R, P, D, W, N> Runtime<S, A, R, P, D, W, N>
where
    S: Read + Write,
    A: AnalogFrontEnd,
    R: Regulator,
    P: FrontPanel,
    D: Display,
    W: Watchdog,
    N: Storage,
{
    pub fn new(board: Board<S, A, R, P, D, W, N>) -> Self {
        Self {
            board,
            system: SystemConfig::default(),
            output: OutputConfig::default(),
            state: RuntimeState::default(),
            interpreter: Interpreter::new(),
        }
    }

    /// Boot sequence: load configuration, apply the power-on output policy,
    /// announce, run the one-time provisioning check, then arm the watchdog,
    /// start the first conversion, and push the initial configuration.
    ///
    /// Boot reporting is best-effort; a dead serial port must not leave the
    /// device half-initialized, so only the provisioning outcome can cut the
    /// sequence short. Returns [`BootAction::AwaitWatchdogReset`] when
    /// provisioning just programmed the option flag; the caller must then
    /// halt.
    pub fn boot(&mut self) -> BootAction {
        self.system = config::load_system(&mut self.board.storage);
        self.output = config::load_output(&mut self.board.storage);
        self.system.output = self.system.default_on;

        let mut banner: heapless::String<48> = heapless::String::new();
        let _ = write!(banner, "\r\n{MODEL} starting: Version {FW_VERSION}\r\n");
        let _ = self.board.serial.write_all(banner.as_bytes());

        let action = provision::ensure_pin_remap(&mut self.board.serial, &mut self.board.storage);
        if action == BootAction::AwaitWatchdogReset {
            return action;
        }

        self.board.watchdog.arm();
        self.board.afe.start(Channel::FIRST);
        output::commit(
            &mut self.board.regulator,
            &self.system,
            &self.output,
            &self.state,
        );
        BootAction::Proceed
    }

    /// One loop iteration.
    pub fn tick(&mut self) -> Result<(), S::Error> {
        self.board.watchdog.service();

        let constant_current = self.board.regulator.constant_current();
        if constant_current != self.state.constant_current {
            self.state.constant_current = constant_current;
            self.board
                .regulator
                .mode_changed(&self.system, constant_current);
        }

        sampling::poll(&mut self.board.afe, &self.system, &mut self.state);

        self.board
            .display
            .refresh(&self.system, &self.output, &self.state);
        let event = self.board.panel.poll();
        self.board
            .panel
            .process(event, &mut self.system, &mut self.output, &self.state);

        self.poll_serial()?;
        if self.interpreter.line_ready() {
            let mut session = Session {
                serial: &mut self.board.serial,
                regulator: &mut self.board.regulator,
                storage: &mut self.board.storage,
                system: &mut self.system,
                output: &mut self.output,
                state: &self.state,
            };
            self.interpreter.dispatch(&mut session)?;
        }
        Ok(())
    }

    /// Drain available receive bytes into the line buffer. Stops at the
    /// first complete line; later bytes stay with the serial driver until
    /// the dispatcher has cleared the buffer.
    fn poll_serial(&mut self) -> Result<(), S::Error> {
        let mut byte = [0u8; 1];
        while !self.interpreter.line_ready() {
            match self.board.serial.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => self.interpreter.push_byte(byte[0]),
                Err(error) => {
                    if matches!(error.kind(), ErrorKind::Other | ErrorKind::TimedOut) {
                        break;
                    }
                    return Err(Error::Serial(error));
                }
            }
        }
        Ok(())
    }

    /// Boot and loop forever. Serial transport failures inside an iteration
    /// cannot be reported anywhere, so the loop carries on; the watchdog
    /// catches anything that actually wedges.
    pub fn run(&mut self) -> ! {
        if self.boot() == BootAction::AwaitWatchdogReset {
            self.board.watchdog.arm();
            halt_await_watchdog();
        }
        loop {
            let _ = self.tick();
        }
    }

    pub fn board_mut(&mut self) -> &mut Board<S, A, R, P, D, W, N> {
        &mut self.board
    }

    pub fn system(&self) -> &SystemConfig {
        &self.system
    }

    pub fn output(&self) -> &OutputConfig {
        &self.output
    }

    pub fn state(&self) -> &RuntimeState {
        &self.state
    }
}

/// Terminal safety state: idle with the watchdog armed and never serviced,
/// so its bounded timeout forces a clean full restart. Intentional; the
/// only sanctioned hang in the firmware.
fn halt_await_watchdog() -> ! {
    loop {
        core::hint::spin_loop();
    }
}
