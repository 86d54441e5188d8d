//! Mock board collaborators for the host-side tests.

use fugit::MillisDurationU32;

use crate::config::{OutputConfig, SystemConfig};
use crate::error::StorageError;
use crate::hal::{
    AnalogFrontEnd, ButtonEvent, Display, FrontPanel, Regulator, Storage, WATCHDOG_TIMEOUT,
    Watchdog,
};
use crate::sampling::Channel;
use crate::state::RuntimeState;

/// In-memory storage with injectable failures.
pub struct MockStorage {
    pub system: Option<SystemConfig>,
    pub output: Option<OutputConfig>,
    pub remap_set: bool,
    pub fail_remap: bool,
    pub fail_system_save: bool,
    pub fail_output_save: bool,
}

impl MockStorage {
    /// No records, pin remap unprogrammed.
    pub fn empty() -> Self {
        Self {
            system: None,
            output: None,
            remap_set: false,
            fail_remap: false,
            fail_system_save: false,
            fail_output_save: false,
        }
    }

    /// Both records present, pin remap unprogrammed.
    pub fn with_records(system: SystemConfig, output: OutputConfig) -> Self {
        Self {
            system: Some(system),
            output: Some(output),
            ..Self::empty()
        }
    }
}

impl Storage for MockStorage {
    fn load_system(&mut self) -> Result<SystemConfig, StorageError> {
        self.system.clone().ok_or(StorageError::Missing)
    }

    fn save_system(&mut self, config: &SystemConfig) -> Result<(), StorageError> {
        if self.fail_system_save {
            return Err(StorageError::WriteFailed);
        }
        self.system = Some(config.clone());
        Ok(())
    }

    fn load_output(&mut self) -> Result<OutputConfig, StorageError> {
        self.output.ok_or(StorageError::Missing)
    }

    fn save_output(&mut self, config: &OutputConfig) -> Result<(), StorageError> {
        if self.fail_output_save {
            return Err(StorageError::WriteFailed);
        }
        self.output = Some(*config);
        Ok(())
    }

    fn pin_remap_set(&mut self) -> bool {
        self.remap_set
    }

    fn provision_pin_remap(&mut self) -> Result<(), StorageError> {
        if self.fail_remap {
            return Err(StorageError::WriteFailed);
        }
        self.remap_set = true;
        Ok(())
    }
}

/// One recorded `apply` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedConfig {
    pub vset: u16,
    pub cset: u16,
    pub enabled: bool,
    pub constant_current: bool,
}

/// Records every configuration push and mode-change notification; the CV/CC
/// sense line is scripted through `cc_line`.
pub struct MockRegulator {
    pub applied: heapless::Vec<AppliedConfig, 16>,
    pub mode_changes: heapless::Vec<bool, 8>,
    pub cc_line: bool,
}

impl MockRegulator {
    pub fn new() -> Self {
        Self {
            applied: heapless::Vec::new(),
            mode_changes: heapless::Vec::new(),
            cc_line: false,
        }
    }
}

impl Regulator for MockRegulator {
    fn apply(&mut self, output: &OutputConfig, system: &SystemConfig, constant_current: bool) {
        let _ = self.applied.push(AppliedConfig {
            vset: output.vset,
            cset: output.cset,
            enabled: system.output,
            constant_current,
        });
    }

    fn mode_changed(&mut self, _system: &SystemConfig, constant_current: bool) {
        let _ = self.mode_changes.push(constant_current);
    }

    fn constant_current(&mut self) -> bool {
        self.cc_line
    }
}

/// Scripted converter: completions queue up in FIFO order and every start
/// request is recorded.
pub struct MockAnalogFrontEnd {
    completions: heapless::Deque<(Channel, u16), 8>,
    pub started: heapless::Vec<Channel, 8>,
}

impl MockAnalogFrontEnd {
    pub fn new() -> Self {
        Self {
            completions: heapless::Deque::new(),
            started: heapless::Vec::new(),
        }
    }

    /// Queue a completed conversion.
    pub fn complete(&mut self, channel: Channel, raw: u16) {
        let _ = self.completions.push_back((channel, raw));
    }
}

impl AnalogFrontEnd for MockAnalogFrontEnd {
    fn completed(&mut self) -> Option<(Channel, u16)> {
        self.completions.pop_front()
    }

    fn start(&mut self, channel: Channel) {
        let _ = self.started.push(channel);
    }
}

/// Front panel returning one scripted event per poll.
pub struct MockPanel {
    pub next_event: ButtonEvent,
    pub polls: usize,
    pub processed: heapless::Vec<ButtonEvent, 8>,
}

impl MockPanel {
    pub fn new() -> Self {
        Self {
            next_event: ButtonEvent::None,
            polls: 0,
            processed: heapless::Vec::new(),
        }
    }
}

impl FrontPanel for MockPanel {
    fn poll(&mut self) -> ButtonEvent {
        self.polls += 1;
        core::mem::take(&mut self.next_event)
    }

    fn process(
        &mut self,
        event: ButtonEvent,
        _system: &mut SystemConfig,
        _output: &mut OutputConfig,
        _state: &RuntimeState,
    ) {
        if event != ButtonEvent::None {
            let _ = self.processed.push(event);
        }
    }
}

pub struct MockDisplay {
    pub refreshes: usize,
}

impl MockDisplay {
    pub fn new() -> Self {
        Self { refreshes: 0 }
    }
}

impl Display for MockDisplay {
    fn refresh(&mut self, _system: &SystemConfig, _output: &OutputConfig, _state: &RuntimeState) {
        self.refreshes += 1;
    }
}

/// Watchdog with a simulated clock: tests advance `elapsed` and check it
/// against [`WATCHDOG_TIMEOUT`]; a service resets it.
pub struct MockWatchdog {
    pub armed: bool,
    pub services: usize,
    pub elapsed: MillisDurationU32,
}

impl MockWatchdog {
    pub fn new() -> Self {
        Self {
            armed: false,
            services: 0,
            elapsed: MillisDurationU32::millis(0),
        }
    }

    /// True when the deadline passed without a service.
    pub fn expired(&self) -> bool {
        self.armed && self.elapsed >= WATCHDOG_TIMEOUT
    }
}

impl Watchdog for MockWatchdog {
    fn arm(&mut self) {
        self.armed = true;
    }

    fn service(&mut self) {
        self.services += 1;
        self.elapsed = MillisDurationU32::millis(0);
    }
}
