//! One-time pin-remap provisioning.
//!
//! The PWM output pins sit behind a persistent option flag that must be
//! programmed exactly once per device. The check runs at boot, before the
//! watchdog's periodic keep-alive begins, and the only way to make a fresh
//! flag take effect is a clean reset — so a successful write ends in the
//! [`BootAction::AwaitWatchdogReset`] terminal state rather than continuing
//! with half-applied pin routing.
//!
//! Reporting is best-effort: the action is decided by the storage outcome
//! alone, and a dead serial port cannot change it. Once the flag is
//! programmed the reset must happen whether or not the operator heard
//! about it.

use embedded_io::Write;

use crate::hal::Storage;

/// How the boot sequence proceeds after the provisioning check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootAction {
    /// Flag already set, or the write failed (retried next boot): carry on.
    Proceed,
    /// Flag was just programmed: arm the watchdog, stop servicing it, and
    /// idle until it forces a full restart.
    AwaitWatchdogReset,
}

/// Check the pin-remap option flag and program it if unset.
///
/// A failed write is reported and non-fatal; the device stays usable with
/// the flag unset and the write is retried on the next boot.
pub fn ensure_pin_remap<S: Write, N: Storage>(serial: &mut S, storage: &mut N) -> BootAction {
    if storage.pin_remap_set() {
        return BootAction::Proceed;
    }
    match storage.provision_pin_remap() {
        Ok(()) => {
            let _ = serial.write_all(b"PIN REMAP SET, RESETTING THE UNIT\r\n");
            let _ = serial.flush();
            BootAction::AwaitWatchdogReset
        }
        Err(_) => {
            let _ = serial.write_all(b"PIN REMAP NOT SET AND PROGRAMMING FAILED!\r\n");
            BootAction::Proceed
        }
    }
}
