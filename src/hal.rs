//! Hardware collaborator traits.
//!
//! The control loop reaches the board exclusively through these narrow
//! interfaces; chip-specific drivers implement them. None of the methods may
//! block: the loop is cooperative and the watchdog is its only timeout.

use fugit::MillisDurationU32;

use crate::config::{OutputConfig, SystemConfig};
use crate::error::StorageError;
use crate::sampling::Channel;
use crate::state::RuntimeState;

/// Once armed, the watchdog must be serviced at least this often or the
/// hardware forces a full restart.
pub const WATCHDOG_TIMEOUT: MillisDurationU32 = MillisDurationU32::millis(15);

/// Analog front end: one multiplexed converter shared by the three sense
/// channels.
pub trait AnalogFrontEnd {
    /// Return the completed conversion, if any. Must never block; `None`
    /// means the converter is still busy (or idle).
    fn completed(&mut self) -> Option<(Channel, u16)>;

    /// Start a conversion on the given channel.
    fn start(&mut self, channel: Channel);
}

/// Regulation hardware driver: PWM stages plus the CV/CC sense line.
///
/// `apply` and `mode_changed` are fire-and-forget; the driver owns the
/// duty-cycle math (via the PWM calibration pairs in [`SystemConfig`]) and
/// the regulation state machine that decides CV/CC transitions.
pub trait Regulator {
    /// Push set-points and the output-enable flag to the PWM stages. The
    /// live constant-current flag selects the PWM direction.
    fn apply(&mut self, output: &OutputConfig, system: &SystemConfig, constant_current: bool);

    /// Notification that the sensed regulation mode changed.
    fn mode_changed(&mut self, system: &SystemConfig, constant_current: bool);

    /// Sample the CV/CC sense line. True while limiting current.
    fn constant_current(&mut self) -> bool;
}

/// Debounced logical button event produced by the front-panel driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ButtonEvent {
    #[default]
    None,
    Select,
    SelectLong,
    Adjust,
    AdjustLong,
}

/// Front panel: button driver plus the local-UI state machine.
pub trait FrontPanel {
    /// Poll the debounced button driver.
    fn poll(&mut self) -> ButtonEvent;

    /// Run the local-UI state machine for one event. May mutate the
    /// configuration records (e.g. stepping the set-voltage).
    fn process(
        &mut self,
        event: ButtonEvent,
        system: &mut SystemConfig,
        output: &mut OutputConfig,
        state: &RuntimeState,
    );
}

/// Display refresh, fire-and-forget; reads state and configuration only.
pub trait Display {
    fn refresh(&mut self, system: &SystemConfig, output: &OutputConfig, state: &RuntimeState);
}

/// Hardware watchdog. Arm once at boot, then service every loop iteration,
/// always within [`WATCHDOG_TIMEOUT`] of the previous service.
pub trait Watchdog {
    fn arm(&mut self);
    fn service(&mut self);
}

/// Non-volatile storage for the two configuration records and the one-time
/// pin-remap option flag.
///
/// The record format is the implementor's concern; it only has to round-trip
/// the records or signal failure.
pub trait Storage {
    fn load_system(&mut self) -> Result<SystemConfig, StorageError>;
    fn save_system(&mut self, config: &SystemConfig) -> Result<(), StorageError>;
    fn load_output(&mut self) -> Result<OutputConfig, StorageError>;
    fn save_output(&mut self, config: &OutputConfig) -> Result<(), StorageError>;

    /// Whether the persistent pin-remap option flag is already programmed.
    fn pin_remap_set(&mut self) -> bool;

    /// Attempt the protected write of the pin-remap option flag.
    fn provision_pin_remap(&mut self) -> Result<(), StorageError>;
}
